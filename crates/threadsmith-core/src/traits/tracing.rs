use crate::{Period, SegmentationSource, ServiceMetrics, Stage};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Metrics adapter that logs events via `tracing`
#[derive(Debug, Clone, Default)]
pub struct TracingMetrics {
    /// Service name/prefix (optional)
    service_name: Option<String>,
}

impl TracingMetrics {
    /// Create new tracing metrics adapter
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with service name prefix
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }
}

impl ServiceMetrics for TracingMetrics {
    fn record_cache_hit(&self, fingerprint: &str) {
        debug!(
            target: "threadsmith",
            event = "cache_hit",
            fingerprint = %fingerprint,
            service = ?self.service_name,
            "Response cache hit"
        );
    }

    fn record_cache_miss(&self, fingerprint: &str) {
        debug!(
            target: "threadsmith",
            event = "cache_miss",
            fingerprint = %fingerprint,
            service = ?self.service_name,
            "Response cache miss"
        );
    }

    fn record_rate_limited(&self, client: &str) {
        info!(
            target: "threadsmith",
            event = "rate_limited",
            client = %client,
            service = ?self.service_name,
            "Request rate limited"
        );
    }

    fn record_quota_exceeded(&self, period: Period) {
        info!(
            target: "threadsmith",
            event = "quota_exceeded",
            period = %period,
            service = ?self.service_name,
            "Usage quota exceeded"
        );
    }

    fn record_store_fallback(&self, operation: &'static str) {
        warn!(
            target: "threadsmith",
            event = "store_fallback",
            operation = operation,
            service = ?self.service_name,
            "Store operation served by local fallback"
        );
    }

    fn record_fetch_attempt(&self, host: &str, attempt: u32, success: bool) {
        debug!(
            target: "threadsmith",
            event = "fetch_attempt",
            host = %host,
            attempt = attempt,
            success = success,
            service = ?self.service_name,
            "Fetch attempt finished"
        );
    }

    fn record_segmentation(&self, source: SegmentationSource) {
        debug!(
            target: "threadsmith",
            event = "segmentation",
            source = source.as_str(),
            service = ?self.service_name,
            "Tweets generated"
        );
    }

    fn record_latency(&self, stage: Stage, duration: Duration) {
        tracing::trace!(
            target: "threadsmith",
            event = "latency",
            stage = stage.as_str(),
            duration_ms = duration.as_millis(),
            service = ?self.service_name,
            "Stage latency"
        );
    }
}
