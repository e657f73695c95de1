use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use threadsmith_core::{
    BatchOp, NoopMetrics, Result, ServiceMetrics, StoreBackend, StoreStats, WindowCount,
};

use super::circuit_breaker::CircuitBreaker;

/// Which backend is currently answering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    /// Remote store healthy (or being probed)
    Remote,
    /// Breaker open: every call goes to the local fallback
    Degraded,
}

/// Remote store with a local fallback
///
/// Every operation goes to the remote unless the breaker is open. When the
/// remote is unreachable the call is re-run on the local store, so callers
/// never see a connection error. While degraded, counts are only exact within
/// this process.
pub struct DegradingStore<R, L> {
    remote: R,
    local: L,
    circuit_breaker: CircuitBreaker,
    fallbacks: Arc<RwLock<u64>>,
    metrics: Arc<dyn ServiceMetrics>,
}

impl<R, L> DegradingStore<R, L> {
    /// Create a new degrading store
    pub fn new(remote: R, local: L, circuit_breaker: CircuitBreaker) -> Self {
        Self {
            remote,
            local,
            circuit_breaker,
            fallbacks: Arc::new(RwLock::new(0)),
            metrics: Arc::new(NoopMetrics),
        }
    }

    /// Report fallbacks to a metrics sink
    pub fn with_metrics(mut self, metrics: Arc<dyn ServiceMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Current mode
    pub fn mode(&self) -> StoreMode {
        if self.circuit_breaker.is_open() {
            StoreMode::Degraded
        } else {
            StoreMode::Remote
        }
    }

    fn note_fallback(&self, operation: &'static str) {
        *self.fallbacks.write() += 1;
        self.metrics.record_store_fallback(operation);
    }
}

/// Run `$call` against the remote, falling back to the local store
macro_rules! degrade {
    ($self:ident, $op:literal, $backend:ident => $call:expr) => {{
        if $self.circuit_breaker.allow_request() {
            let $backend = &$self.remote;
            match $call.await {
                Ok(value) => {
                    $self.circuit_breaker.report_success();
                    return Ok(value);
                }
                Err(err) if CircuitBreaker::is_failure(&err) => {
                    $self.circuit_breaker.report_failure();
                    warn!(
                        operation = $op,
                        error = %err,
                        "Remote store unavailable, serving from local fallback"
                    );
                }
                Err(err) => return Err(err),
            }
        } else {
            debug!(operation = $op, "Circuit open, serving from local fallback");
        }
        $self.note_fallback($op);
        let $backend = &$self.local;
        $call.await
    }};
}

#[async_trait]
impl<R, L> StoreBackend for DegradingStore<R, L>
where
    R: StoreBackend,
    L: StoreBackend,
{
    fn name(&self) -> &'static str {
        "degrading"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        degrade!(self, "get", backend => backend.get(key))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        degrade!(self, "set", backend => backend.set(key, value.clone(), ttl))
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        degrade!(self, "delete", backend => backend.delete(key))
    }

    async fn incr_window(&self, key: &str, window: Duration) -> Result<WindowCount> {
        degrade!(self, "incr_window", backend => backend.incr_window(key, window))
    }

    async fn apply_batch(&self, ops: &[BatchOp]) -> Result<Vec<u64>> {
        degrade!(self, "apply_batch", backend => backend.apply_batch(ops))
    }

    async fn get_counters(&self, keys: &[&str]) -> Result<Vec<u64>> {
        degrade!(self, "get_counters", backend => backend.get_counters(keys))
    }

    async fn ping(&self) -> Result<()> {
        // Health reflects the remote; the fallback is always up
        self.remote.ping().await
    }

    fn stats(&self) -> StoreStats {
        let mut stats = self.remote.stats();
        stats.merge(&self.local.stats());
        stats.fallbacks += *self.fallbacks.read();
        stats
    }
}
