//! Rate limiting and free-tier usage accounting

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use threadsmith_core::{
    keys, Batch, Clock, Identity, JsonSerializer, NoopMetrics, Period, RateWindow, Result,
    Serializer, ServiceMetrics, StoreBackend, SystemClock, UsageEvent,
};

const DAY: u64 = 24 * 3600;

/// How long each counter family is kept
#[derive(Debug, Clone)]
pub struct Retention {
    pub daily: Duration,
    pub monthly: Duration,
    pub stats: Duration,
    pub events: Duration,
}

impl Default for Retention {
    fn default() -> Self {
        Self {
            daily: Duration::from_secs(2 * DAY),
            monthly: Duration::from_secs(35 * DAY),
            stats: Duration::from_secs(90 * DAY),
            events: Duration::from_secs(DAY),
        }
    }
}

/// Free-tier ceilings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaLimits {
    pub daily: u64,
    pub monthly: u64,
}

impl Default for QuotaLimits {
    fn default() -> Self {
        Self {
            daily: 5,
            monthly: 50,
        }
    }
}

impl QuotaLimits {
    pub fn for_period(&self, period: Period) -> u64 {
        match period {
            Period::Daily => self.daily,
            Period::Monthly => self.monthly,
        }
    }
}

/// Usage of one period across both identities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageCount {
    pub ip_count: u64,
    /// Zero when the request carries no email
    pub email_count: u64,
    /// `max(ip_count, email_count)`
    pub combined: u64,
}

impl UsageCount {
    pub fn new(ip_count: u64, email_count: u64) -> Self {
        Self {
            ip_count,
            email_count,
            combined: ip_count.max(email_count),
        }
    }
}

/// Daily and monthly usage against the free-tier limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    pub daily: UsageCount,
    pub monthly: UsageCount,
    pub limits: QuotaLimits,
    pub daily_remaining: u64,
    pub monthly_remaining: u64,
    /// First exhausted period, daily before monthly
    pub blocked_by: Option<Period>,
}

impl UsageSummary {
    pub fn new(daily: UsageCount, monthly: UsageCount, limits: QuotaLimits) -> Self {
        // Either identity at its limit blocks the request
        let blocked_by = if daily.combined >= limits.daily {
            Some(Period::Daily)
        } else if monthly.combined >= limits.monthly {
            Some(Period::Monthly)
        } else {
            None
        };

        Self {
            daily,
            monthly,
            limits,
            daily_remaining: limits.daily.saturating_sub(daily.combined),
            monthly_remaining: limits.monthly.saturating_sub(monthly.combined),
            blocked_by,
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked_by.is_some()
    }
}

/// Atomic counters for rate limits and quotas
///
/// Every multi-key update is a single store batch. Outages of the shared store
/// are absorbed by the store itself (see `DegradingStore`); errors that still
/// reach this layer make rate limiting fail open, usage tracking report
/// `false`, and usage reads fail.
pub struct QuotaStore {
    store: Arc<dyn StoreBackend>,
    limits: QuotaLimits,
    retention: Retention,
    clock: Arc<dyn Clock>,
    metrics: Arc<dyn ServiceMetrics>,
}

impl QuotaStore {
    pub fn new(store: Arc<dyn StoreBackend>, limits: QuotaLimits) -> Self {
        Self {
            store,
            limits,
            retention: Retention::default(),
            clock: Arc::new(SystemClock),
            metrics: Arc::new(NoopMetrics),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn ServiceMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_retention(mut self, retention: Retention) -> Self {
        self.retention = retention;
        self
    }

    pub fn limits(&self) -> QuotaLimits {
        self.limits
    }

    /// Fixed-window check for `client`
    ///
    /// The first request of a window creates the counter and its expiry; the
    /// window resets in one step when that expiry passes.
    pub async fn check_rate_limit(&self, client: &str, limit: u64, window: Duration) -> RateWindow {
        match self.store.incr_window(&keys::rate_limit(client), window).await {
            Ok(count) => {
                let decision = RateWindow::evaluate(count, limit);
                if !decision.allowed {
                    debug!(client, used = decision.used, limit, "Rate limited");
                    self.metrics.record_rate_limited(client);
                }
                decision
            }
            Err(err) => {
                warn!(client, error = %err, "Rate limit check failed, allowing request");
                RateWindow::fail_open(limit, window)
            }
        }
    }

    /// Count one generation against every identity, in one atomic batch
    ///
    /// Increments the ip (and email) daily and monthly counters, the global
    /// daily counter, and writes a short-lived event record.
    pub async fn track_usage(&self, ip: &str, email: Option<&str>) -> bool {
        let now = self.clock.now();
        let mut identities = vec![Identity::ip(ip)];
        identities.extend(Identity::maybe_email(email));

        let mut batch = Batch::new();
        for identity in &identities {
            batch = batch
                .incr(keys::usage(identity, Period::Daily, now), self.retention.daily)
                .incr(keys::usage(identity, Period::Monthly, now), self.retention.monthly);
        }
        batch = batch.incr(keys::generations(now), self.retention.stats);

        let event = UsageEvent::new(ip, email.map(str::to_string), now);
        match JsonSerializer.serialize(&event) {
            Ok(bytes) => {
                let id = format!("{:016x}", rand::random::<u64>());
                batch = batch.put(keys::usage_event(now, &id), bytes, self.retention.events);
            }
            Err(err) => warn!(error = %err, "Skipping usage event record"),
        }

        match self.store.apply_batch(&batch.build()).await {
            Ok(_) => true,
            Err(err) => {
                warn!(ip, error = %err, "Failed to record usage");
                false
            }
        }
    }

    /// Usage of `period` for the ip and, when given, the email
    pub async fn get_usage(&self, ip: &str, email: Option<&str>, period: Period) -> Result<UsageCount> {
        let now = self.clock.now();
        let ip_key = keys::usage(&Identity::ip(ip), period, now);

        match Identity::maybe_email(email) {
            Some(identity) => {
                let email_key = keys::usage(&identity, period, now);
                let counts = self.store.get_counters(&[ip_key.as_str(), email_key.as_str()]).await?;
                Ok(UsageCount::new(
                    counts.first().copied().unwrap_or(0),
                    counts.get(1).copied().unwrap_or(0),
                ))
            }
            None => {
                let counts = self.store.get_counters(&[ip_key.as_str()]).await?;
                Ok(UsageCount::new(counts.first().copied().unwrap_or(0), 0))
            }
        }
    }

    /// Daily and monthly usage with limits and the blocking period, if any
    pub async fn usage_summary(&self, ip: &str, email: Option<&str>) -> Result<UsageSummary> {
        let daily = self.get_usage(ip, email, Period::Daily).await?;
        let monthly = self.get_usage(ip, email, Period::Monthly).await?;
        Ok(UsageSummary::new(daily, monthly, self.limits))
    }

    /// Generations recorded on `date` (UTC) across all users
    pub async fn generations_on(&self, date: NaiveDate) -> Result<u64> {
        let at = date.and_time(NaiveTime::MIN).and_utc();
        let key = keys::generations(at);
        let counts = self.store.get_counters(&[key.as_str()]).await?;
        Ok(counts.first().copied().unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use threadsmith_core::ManualClock;
    use threadsmith_storage::LocalStore;

    const HOUR: Duration = Duration::from_secs(3600);

    fn quota(clock: &ManualClock) -> (QuotaStore, LocalStore) {
        let store = LocalStore::with_defaults();
        let quota = QuotaStore::new(Arc::new(store.clone()), QuotaLimits::default())
            .with_clock(Arc::new(clock.clone()));
        (quota, store)
    }

    fn clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 31, 23, 0, 0).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_boundary() {
        let (quota, _) = quota(&clock());

        for i in 1..=5 {
            let decision = quota.check_rate_limit("1.2.3.4", 5, HOUR).await;
            assert!(decision.allowed, "request {i} should pass");
            assert_eq!(decision.used, i);
            assert_eq!(decision.remaining, 5 - i);
        }

        let sixth = quota.check_rate_limit("1.2.3.4", 5, HOUR).await;
        assert!(!sixth.allowed);
        assert_eq!(sixth.remaining, 0);
        assert!(sixth.reset_seconds <= 3600);

        // Other clients have their own window
        assert!(quota.check_rate_limit("5.6.7.8", 5, HOUR).await.allowed);

        tokio::time::advance(HOUR + Duration::from_secs(1)).await;
        let after = quota.check_rate_limit("1.2.3.4", 5, HOUR).await;
        assert!(after.allowed);
        assert_eq!(after.used, 1);
    }

    #[tokio::test]
    async fn test_track_usage_counts_every_identity() {
        let clock = clock();
        let (quota, store) = quota(&clock);

        assert!(quota.track_usage("1.2.3.4", Some(" Alice@Example.com ")).await);
        assert!(quota.track_usage("1.2.3.4", None).await);

        let daily = quota
            .get_usage("1.2.3.4", Some("alice@example.com"), Period::Daily)
            .await
            .unwrap();
        assert_eq!(daily, UsageCount::new(2, 1));
        assert_eq!(daily.combined, 2);

        let now = clock.now();
        assert_eq!(
            store.get_counters(&[keys::generations(now).as_str()]).await.unwrap(),
            vec![2]
        );
        assert_eq!(quota.generations_on(now.date_naive()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_email_usage_blocks_new_ip() {
        let (quota, _) = quota(&clock());
        for _ in 0..5 {
            quota.track_usage("10.0.0.1", Some("bob@example.com")).await;
        }

        // Fresh IP, same email: the email dimension is at its limit
        let summary = quota.usage_summary("10.0.0.2", Some("bob@example.com")).await.unwrap();
        assert_eq!(summary.daily.ip_count, 0);
        assert_eq!(summary.daily.email_count, 5);
        assert_eq!(summary.blocked_by, Some(Period::Daily));
        assert_eq!(summary.daily_remaining, 0);

        let summary = quota.usage_summary("10.0.0.2", None).await.unwrap();
        assert!(!summary.is_blocked());
    }

    #[tokio::test]
    async fn test_period_rollover() {
        let clock = clock();
        let (quota, _) = quota(&clock);
        quota.track_usage("1.1.1.1", None).await;

        // 23:00 on the 31st plus two hours: new day and new month
        clock.advance(chrono::Duration::hours(2));
        let summary = quota.usage_summary("1.1.1.1", None).await.unwrap();
        assert_eq!(summary.daily.combined, 0);
        assert_eq!(summary.monthly.combined, 0);
    }

    #[test]
    fn test_monthly_limit_blocks() {
        let summary = UsageSummary::new(
            UsageCount::new(1, 0),
            UsageCount::new(50, 0),
            QuotaLimits::default(),
        );
        assert_eq!(summary.blocked_by, Some(Period::Monthly));
        assert_eq!(summary.monthly_remaining, 0);
        assert_eq!(summary.daily_remaining, 4);
    }

    #[test]
    fn test_summary_serializes_camel_case() {
        let summary = UsageSummary::new(UsageCount::default(), UsageCount::default(), QuotaLimits::default());
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["dailyRemaining"], 5);
        assert_eq!(json["daily"]["ipCount"], 0);
        assert!(json["blockedBy"].is_null());
    }
}
