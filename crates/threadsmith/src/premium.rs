//! Premium entitlements keyed by IP and email

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use threadsmith_core::{
    keys, BatchOp, Clock, GrantSource, Identity, JsonSerializer, PremiumGrant, Result, Serializer,
    StoreBackend, SystemClock,
};

/// Storage TTL padding past a grant's own expiry
pub const GRANT_STORAGE_BUFFER_DAYS: u32 = 7;

/// Outcome of merging the IP and email grants
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantMatch {
    /// No grant in force; `expired` when one exists but has lapsed
    NoGrant { expired: Option<PremiumGrant> },
    ByIp(PremiumGrant),
    ByEmail(PremiumGrant),
}

impl GrantMatch {
    /// Merge the two lookups
    ///
    /// A valid email grant wins, then a valid IP grant. Expiry is exclusive:
    /// at `expires_at` a grant no longer counts.
    pub fn resolve(
        ip_grant: Option<PremiumGrant>,
        email_grant: Option<PremiumGrant>,
        now: DateTime<Utc>,
    ) -> Self {
        match (ip_grant, email_grant) {
            (_, Some(email)) if email.is_active_at(now) => GrantMatch::ByEmail(email),
            (Some(ip), _) if ip.is_active_at(now) => GrantMatch::ByIp(ip),
            (ip, email) => GrantMatch::NoGrant {
                expired: [ip, email]
                    .into_iter()
                    .flatten()
                    .max_by_key(|grant| grant.expires_at),
            },
        }
    }
}

/// Where a premium status came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PremiumSource {
    Ip,
    Email,
    Expired,
    None,
}

/// Premium status reported for a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PremiumStatus {
    pub has_premium: bool,
    pub source: PremiumSource,
    pub plan: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<GrantMatch> for PremiumStatus {
    fn from(found: GrantMatch) -> Self {
        let (has_premium, source, grant) = match found {
            GrantMatch::ByEmail(grant) => (true, PremiumSource::Email, Some(grant)),
            GrantMatch::ByIp(grant) => (true, PremiumSource::Ip, Some(grant)),
            GrantMatch::NoGrant { expired: Some(grant) } => (false, PremiumSource::Expired, Some(grant)),
            GrantMatch::NoGrant { expired: None } => (false, PremiumSource::None, None),
        };
        Self {
            has_premium,
            source,
            plan: grant.as_ref().map(|g| g.plan.clone()),
            expires_at: grant.map(|g| g.expires_at),
        }
    }
}

/// Reads and writes premium grants
pub struct PremiumGate<S = JsonSerializer>
where
    S: Serializer,
{
    store: Arc<dyn StoreBackend>,
    serializer: S,
    clock: Arc<dyn Clock>,
}

impl PremiumGate<JsonSerializer> {
    pub fn new(store: Arc<dyn StoreBackend>) -> Self {
        Self {
            store,
            serializer: JsonSerializer,
            clock: Arc::new(SystemClock),
        }
    }
}

impl<S: Serializer> PremiumGate<S> {
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Read one grant; unreadable or newer records count as absent
    async fn load(&self, identity: &Identity) -> Result<Option<PremiumGrant>> {
        let Some(bytes) = self.store.get(&keys::premium(identity)).await? else {
            return Ok(None);
        };
        match self.serializer.deserialize_versioned::<PremiumGrant>(&bytes) {
            Ok(grant) => Ok(Some(grant)),
            Err(err) => {
                warn!(kind = identity.kind(), error = %err, "Ignoring unreadable premium grant");
                Ok(None)
            }
        }
    }

    /// Look up both identities and merge the result
    pub async fn lookup(&self, ip: &str, email: Option<&str>) -> Result<GrantMatch> {
        let ip_grant = self.load(&Identity::ip(ip)).await?;
        let email_grant = match Identity::maybe_email(email) {
            Some(identity) => self.load(&identity).await?,
            None => None,
        };
        Ok(GrantMatch::resolve(ip_grant, email_grant, self.clock.now()))
    }

    /// Premium status for a request
    pub async fn check(&self, ip: &str, email: Option<&str>) -> Result<PremiumStatus> {
        Ok(self.lookup(ip, email).await?.into())
    }

    /// Grant `plan` for `duration_days` to the IP and, if given, the email
    ///
    /// Both records are written in one batch. Storage keeps them for
    /// `duration_days + 7` days; the `expires_at` comparison alone decides
    /// whether a grant is in force.
    pub async fn grant(
        &self,
        ip: &str,
        email: Option<&str>,
        plan: &str,
        duration_days: u32,
    ) -> Result<PremiumStatus> {
        let now = self.clock.now();
        let storage_days = u64::from(duration_days.saturating_add(GRANT_STORAGE_BUFFER_DAYS));
        let ttl = Duration::from_secs(storage_days * 24 * 3600);

        let mut targets = vec![(Identity::ip(ip), GrantSource::Ip)];
        if let Some(identity) = Identity::maybe_email(email) {
            targets.push((identity, GrantSource::Email));
        }

        let mut ops = Vec::with_capacity(targets.len());
        let mut strongest = None;
        for (identity, source) in targets {
            let grant = PremiumGrant::new(plan, source, now, duration_days);
            ops.push(BatchOp::put(
                keys::premium(&identity),
                self.serializer.serialize(&grant)?,
                ttl,
            ));
            strongest = Some(grant);
        }
        self.store.apply_batch(&ops).await?;

        info!(plan, duration_days, with_email = email.is_some(), "Premium granted");
        let found = match strongest {
            Some(grant) if grant.source == GrantSource::Email => GrantMatch::ByEmail(grant),
            Some(grant) => GrantMatch::ByIp(grant),
            None => GrantMatch::NoGrant { expired: None },
        };
        Ok(found.into())
    }

    /// Remove grants for the IP and email; true if any existed
    pub async fn revoke(&self, ip: &str, email: Option<&str>) -> Result<bool> {
        let mut removed = self.store.delete(&keys::premium(&Identity::ip(ip))).await?;
        if let Some(identity) = Identity::maybe_email(email) {
            removed |= self.store.delete(&keys::premium(&identity)).await?;
        }
        Ok(removed)
    }
}
