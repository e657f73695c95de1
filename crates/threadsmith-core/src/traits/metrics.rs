//! Metrics trait for service observability

use std::time::Duration;

use crate::Period;

/// Pipeline stage for latency tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    RateLimit,
    Premium,
    Quota,
    Reserve,
    CacheLookup,
    Acquire,
    Segment,
    CacheStore,
    Total,
}

impl Stage {
    /// Get stage as string label
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::RateLimit => "rate_limit",
            Stage::Premium => "premium",
            Stage::Quota => "quota",
            Stage::Reserve => "reserve",
            Stage::CacheLookup => "cache_lookup",
            Stage::Acquire => "acquire",
            Stage::Segment => "segment",
            Stage::CacheStore => "cache_store",
            Stage::Total => "total",
        }
    }
}

/// Who produced a tweet sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentationSource {
    /// The external AI collaborator
    Ai,
    /// The local segmenter, used directly
    Segmenter,
    /// The local segmenter after the AI collaborator failed
    Fallback,
}

impl SegmentationSource {
    /// Get source as string label
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentationSource::Ai => "ai",
            SegmentationSource::Segmenter => "segmenter",
            SegmentationSource::Fallback => "fallback",
        }
    }
}

/// Trait for service metrics/observability
///
/// Implement this to integrate with your metrics system (Prometheus, StatsD, etc.)
pub trait ServiceMetrics: Send + Sync + 'static {
    /// Record a response-cache hit
    fn record_cache_hit(&self, fingerprint: &str);

    /// Record a response-cache miss
    fn record_cache_miss(&self, fingerprint: &str);

    /// Record a request rejected by the rate limiter
    fn record_rate_limited(&self, client: &str);

    /// Record a request rejected by the usage quota
    fn record_quota_exceeded(&self, period: Period);

    /// Record a store operation served by the local fallback
    fn record_store_fallback(&self, operation: &'static str);

    /// Record one fetch attempt
    fn record_fetch_attempt(&self, host: &str, attempt: u32, success: bool);

    /// Record which path produced the tweets
    fn record_segmentation(&self, source: SegmentationSource);

    /// Record stage latency
    fn record_latency(&self, stage: Stage, duration: Duration);
}

/// No-op metrics implementation (default)
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl ServiceMetrics for NoopMetrics {
    #[inline]
    fn record_cache_hit(&self, _fingerprint: &str) {}

    #[inline]
    fn record_cache_miss(&self, _fingerprint: &str) {}

    #[inline]
    fn record_rate_limited(&self, _client: &str) {}

    #[inline]
    fn record_quota_exceeded(&self, _period: Period) {}

    #[inline]
    fn record_store_fallback(&self, _operation: &'static str) {}

    #[inline]
    fn record_fetch_attempt(&self, _host: &str, _attempt: u32, _success: bool) {}

    #[inline]
    fn record_segmentation(&self, _source: SegmentationSource) {}

    #[inline]
    fn record_latency(&self, _stage: Stage, _duration: Duration) {}
}

/// Metrics adapter using the `metrics` crate
///
/// Integrates with Prometheus, StatsD, and other exporters via the `metrics` ecosystem.
///
/// # Example
/// ```ignore
/// use threadsmith_core::MetricsCrateAdapter;
///
/// let metrics = MetricsCrateAdapter::new("threadsmith");
/// // Emits: threadsmith_cache_hits_total, threadsmith_quota_exceeded_total, etc.
/// ```
#[cfg(feature = "metrics")]
#[derive(Debug, Clone)]
pub struct MetricsCrateAdapter {
    prefix: String,
}

#[cfg(feature = "metrics")]
impl MetricsCrateAdapter {
    /// Create a new adapter with the given metric name prefix
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn metric_name(&self, name: &str) -> String {
        format!("{}_{}", self.prefix, name)
    }
}

#[cfg(feature = "metrics")]
impl ServiceMetrics for MetricsCrateAdapter {
    fn record_cache_hit(&self, _fingerprint: &str) {
        metrics::counter!(self.metric_name("cache_hits_total")).increment(1);
    }

    fn record_cache_miss(&self, _fingerprint: &str) {
        metrics::counter!(self.metric_name("cache_misses_total")).increment(1);
    }

    fn record_rate_limited(&self, _client: &str) {
        metrics::counter!(self.metric_name("rate_limited_total")).increment(1);
    }

    fn record_quota_exceeded(&self, period: Period) {
        metrics::counter!(
            self.metric_name("quota_exceeded_total"),
            "period" => period.as_str()
        )
        .increment(1);
    }

    fn record_store_fallback(&self, operation: &'static str) {
        metrics::counter!(
            self.metric_name("store_fallbacks_total"),
            "operation" => operation
        )
        .increment(1);
    }

    fn record_fetch_attempt(&self, _host: &str, _attempt: u32, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        metrics::counter!(
            self.metric_name("fetch_attempts_total"),
            "outcome" => outcome
        )
        .increment(1);
    }

    fn record_segmentation(&self, source: SegmentationSource) {
        metrics::counter!(
            self.metric_name("generations_total"),
            "source" => source.as_str()
        )
        .increment(1);
    }

    fn record_latency(&self, stage: Stage, duration: Duration) {
        metrics::histogram!(
            self.metric_name("stage_duration_seconds"),
            "stage" => stage.as_str()
        )
        .record(duration.as_secs_f64());
    }
}
