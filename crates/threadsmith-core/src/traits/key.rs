//! Store key trait and the key namespace

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Trait for types that address a slot in the backing store
pub trait StoreKey: Send + Sync {
    /// Generate the key string
    fn store_key(&self) -> String;

    /// Optional namespace for the key
    fn namespace(&self) -> Option<&str> {
        None
    }

    /// Get the full key including namespace
    fn full_key(&self) -> String {
        match self.namespace() {
            Some(ns) => format!("{}:{}", ns, self.store_key()),
            None => self.store_key(),
        }
    }
}

impl StoreKey for String {
    fn store_key(&self) -> String {
        self.clone()
    }
}

impl StoreKey for &str {
    fn store_key(&self) -> String {
        self.to_string()
    }
}

/// Composite key builder for namespaced keys
#[derive(Debug, Clone)]
pub struct CompositeKey {
    parts: Vec<String>,
    ns: Option<String>,
}

impl CompositeKey {
    /// Create a new composite key builder
    pub fn new() -> Self {
        Self {
            parts: Vec::new(),
            ns: None,
        }
    }

    /// Set the namespace
    pub fn with_namespace(mut self, ns: impl Into<String>) -> Self {
        self.ns = Some(ns.into());
        self
    }

    /// Add a part to the key
    pub fn part(mut self, part: impl Display) -> Self {
        self.parts.push(part.to_string());
        self
    }
}

impl Default for CompositeKey {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreKey for CompositeKey {
    fn store_key(&self) -> String {
        self.parts.join(":")
    }

    fn namespace(&self) -> Option<&str> {
        self.ns.as_deref()
    }
}

/// Quota accounting period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Daily,
    Monthly,
}

impl Period {
    /// Get period as string label
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Daily => "daily",
            Period::Monthly => "monthly",
        }
    }

    /// UTC period key: `YYYY-MM-DD` for daily, `YYYY-MM` for monthly
    pub fn period_key(&self, now: DateTime<Utc>) -> String {
        match self {
            Period::Daily => now.format("%Y-%m-%d").to_string(),
            Period::Monthly => now.format("%Y-%m").to_string(),
        }
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity a quota or grant is keyed by
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    Ip(String),
    Email(String),
}

impl Identity {
    /// Client address identity
    pub fn ip(ip: impl AsRef<str>) -> Self {
        Identity::Ip(ip.as_ref().trim().to_string())
    }

    /// Email identity; trimmed and lower-cased
    pub fn email(email: impl AsRef<str>) -> Self {
        Identity::Email(email.as_ref().trim().to_lowercase())
    }

    /// Email identity from an optional, possibly blank value
    pub fn maybe_email(email: Option<&str>) -> Option<Self> {
        email
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(Identity::email)
    }

    /// Get the identity kind label
    pub fn kind(&self) -> &'static str {
        match self {
            Identity::Ip(_) => "ip",
            Identity::Email(_) => "email",
        }
    }

    /// Identity value
    pub fn value(&self) -> &str {
        match self {
            Identity::Ip(v) | Identity::Email(v) => v,
        }
    }
}

/// Key templates for every namespace the services own
pub mod keys {
    use super::{CompositeKey, Identity, Period, StoreKey};
    use chrono::{DateTime, Utc};

    /// `ratelimit:{ip}`
    pub fn rate_limit(ip: &str) -> String {
        CompositeKey::new()
            .with_namespace("ratelimit")
            .part(ip)
            .full_key()
    }

    /// `usage:{ip|email}:{value}:{daily|monthly}:{periodKey}`
    pub fn usage(identity: &Identity, period: Period, now: DateTime<Utc>) -> String {
        CompositeKey::new()
            .with_namespace("usage")
            .part(identity.kind())
            .part(identity.value())
            .part(period)
            .part(period.period_key(now))
            .full_key()
    }

    /// `usage:event:{YYYY-MM-DD}:{id}`
    pub fn usage_event(now: DateTime<Utc>, id: &str) -> String {
        CompositeKey::new()
            .with_namespace("usage")
            .part("event")
            .part(Period::Daily.period_key(now))
            .part(id)
            .full_key()
    }

    /// `stats:generations:{YYYY-MM-DD}`
    pub fn generations(now: DateTime<Utc>) -> String {
        CompositeKey::new()
            .with_namespace("stats")
            .part("generations")
            .part(Period::Daily.period_key(now))
            .full_key()
    }

    /// `premium:{ip|email}:{value}`
    pub fn premium(identity: &Identity) -> String {
        CompositeKey::new()
            .with_namespace("premium")
            .part(identity.kind())
            .part(identity.value())
            .full_key()
    }

    /// `cache:{fingerprintHash}`
    pub fn cache(hash: &str) -> String {
        CompositeKey::new()
            .with_namespace("cache")
            .part(hash)
            .full_key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 13, 45, 0).unwrap()
    }

    #[test]
    fn test_string_key() {
        let key = "my_key".to_string();
        assert_eq!(key.store_key(), "my_key");
        assert_eq!(key.full_key(), "my_key");
    }

    #[test]
    fn test_composite_key() {
        let key = CompositeKey::new()
            .with_namespace("premium")
            .part("ip")
            .part("10.0.0.1");

        assert_eq!(key.store_key(), "ip:10.0.0.1");
        assert_eq!(key.full_key(), "premium:ip:10.0.0.1");
    }

    #[test]
    fn test_period_keys() {
        assert_eq!(Period::Daily.period_key(now()), "2026-10-18");
        assert_eq!(Period::Monthly.period_key(now()), "2026-10");
    }

    #[test]
    fn test_usage_key_templates() {
        let ip = Identity::ip("203.0.113.9");
        let email = Identity::email("  Ada@Example.COM ");
        assert_eq!(
            keys::usage(&ip, Period::Daily, now()),
            "usage:ip:203.0.113.9:daily:2026-10-18"
        );
        assert_eq!(
            keys::usage(&email, Period::Monthly, now()),
            "usage:email:ada@example.com:monthly:2026-10"
        );
    }

    #[test]
    fn test_other_templates() {
        assert_eq!(keys::rate_limit("1.2.3.4"), "ratelimit:1.2.3.4");
        assert_eq!(keys::premium(&Identity::ip("1.2.3.4")), "premium:ip:1.2.3.4");
        assert_eq!(keys::cache("abc"), "cache:abc");
        assert_eq!(keys::generations(now()), "stats:generations:2026-10-18");
        assert_eq!(keys::usage_event(now(), "f00"), "usage:event:2026-10-18:f00");
    }

    #[test]
    fn test_blank_email_is_no_identity() {
        assert!(Identity::maybe_email(Some("   ")).is_none());
        assert!(Identity::maybe_email(None).is_none());
        assert_eq!(
            Identity::maybe_email(Some("A@b.c")),
            Some(Identity::Email("a@b.c".into()))
        );
    }
}
