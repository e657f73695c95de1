//! Versioned records kept in the backing store

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{Result, StoreError};

/// Schema version written by this build
pub const RECORD_VERSION: u32 = 1;

fn current_version() -> u32 {
    RECORD_VERSION
}

/// Records carrying a schema version
pub trait Versioned {
    /// Version the record was written with
    fn version(&self) -> u32;

    /// Reject records written by a newer schema
    fn check_version(&self) -> Result<()> {
        let found = self.version();
        if found > RECORD_VERSION {
            return Err(StoreError::UnsupportedVersion {
                found,
                supported: RECORD_VERSION,
            });
        }
        Ok(())
    }
}

/// A cached response with its bookkeeping fields
///
/// `cached_at` and `ttl_secs` never leave the cache layer: callers only
/// receive `payload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheRecord<T> {
    /// Schema version
    #[serde(default = "current_version")]
    pub version: u32,
    /// The cached value
    pub payload: T,
    /// When the record was written
    pub cached_at: DateTime<Utc>,
    /// Time-to-live in seconds
    pub ttl_secs: u64,
}

impl<T> CacheRecord<T> {
    /// Create a record stamped with the current time
    pub fn new(payload: T, ttl: Duration) -> Self {
        Self {
            version: RECORD_VERSION,
            payload,
            cached_at: Utc::now(),
            ttl_secs: ttl.as_secs(),
        }
    }

    /// Check if the record outlived its TTL at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.cached_at + ChronoDuration::seconds(self.ttl_secs as i64)
    }

    /// Drop the bookkeeping fields
    pub fn into_payload(self) -> T {
        self.payload
    }
}

impl<T> Versioned for CacheRecord<T> {
    fn version(&self) -> u32 {
        self.version
    }
}

/// Which identity a premium grant is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantSource {
    Ip,
    Email,
}

impl GrantSource {
    /// Get source as string label
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantSource::Ip => "ip",
            GrantSource::Email => "email",
        }
    }
}

/// A premium entitlement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PremiumGrant {
    /// Schema version
    #[serde(default = "current_version")]
    pub version: u32,
    /// Plan name (e.g. "monthly")
    pub plan: String,
    /// Identity the grant is keyed by
    pub source: GrantSource,
    /// When the grant was issued
    pub granted_at: DateTime<Utc>,
    /// Exclusive expiry: at or after this instant the grant reads as absent
    pub expires_at: DateTime<Utc>,
}

impl PremiumGrant {
    /// Create a grant starting at `now` and lasting `days`
    pub fn new(plan: impl Into<String>, source: GrantSource, now: DateTime<Utc>, days: u32) -> Self {
        Self {
            version: RECORD_VERSION,
            plan: plan.into(),
            source,
            granted_at: now,
            expires_at: now + ChronoDuration::days(i64::from(days)),
        }
    }

    /// Whether the grant is in force at `now`
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

impl Versioned for PremiumGrant {
    fn version(&self) -> u32 {
        self.version
    }
}

/// Short-lived detail record written for every tracked generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageEvent {
    /// Schema version
    #[serde(default = "current_version")]
    pub version: u32,
    /// Client address
    pub ip: String,
    /// Authenticated email, if any
    pub email: Option<String>,
    /// When the usage was recorded
    pub at: DateTime<Utc>,
}

impl UsageEvent {
    /// Create an event
    pub fn new(ip: impl Into<String>, email: Option<String>, at: DateTime<Utc>) -> Self {
        Self {
            version: RECORD_VERSION,
            ip: ip.into(),
            email,
            at,
        }
    }
}

impl Versioned for UsageEvent {
    fn version(&self) -> u32 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, h, 0, 0).unwrap()
    }

    #[test]
    fn test_cache_record_expiry() {
        let mut record = CacheRecord::new("payload".to_string(), Duration::from_secs(3600));
        record.cached_at = at(1);
        assert!(!record.is_expired_at(at(1)));
        assert!(record.is_expired_at(at(2)));
        assert_eq!(record.into_payload(), "payload");
    }

    #[test]
    fn test_grant_expiry_is_exclusive() {
        let grant = PremiumGrant::new("monthly", GrantSource::Email, at(0), 1);
        assert!(grant.is_active_at(at(23)));
        assert!(!grant.is_active_at(grant.expires_at));
    }

    #[test]
    fn test_version_missing_defaults_to_current() {
        let json = r#"{"plan":"monthly","source":"ip","granted_at":"2026-10-18T00:00:00Z","expires_at":"2026-11-18T00:00:00Z"}"#;
        let grant: PremiumGrant = serde_json::from_str(json).unwrap();
        assert_eq!(grant.version, RECORD_VERSION);
        assert!(grant.check_version().is_ok());
    }

    #[test]
    fn test_newer_version_rejected() {
        let mut grant = PremiumGrant::new("monthly", GrantSource::Ip, at(0), 30);
        grant.version = RECORD_VERSION + 1;
        assert!(matches!(
            grant.check_version(),
            Err(StoreError::UnsupportedVersion { .. })
        ));
    }
}
