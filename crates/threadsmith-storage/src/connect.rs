use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use threadsmith_core::{NoopMetrics, ServiceMetrics, StoreBackend};

use crate::memory::{LocalConfig, LocalStore};

/// How to reach the shared store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Redis URL; `None` runs on the local store only
    pub redis_url: Option<String>,
    /// Maximum pooled Redis connections
    pub pool_size: u32,
    /// Time allowed to check a connection out of the pool
    pub connection_timeout: Duration,
    /// Consecutive failures before the breaker opens
    pub failure_threshold: u32,
    /// How long the breaker stays open before probing again
    pub reset_timeout: Duration,
    /// Bounds for the local store
    pub local: LocalConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            pool_size: 10,
            connection_timeout: Duration::from_secs(2),
            failure_threshold: 3,
            reset_timeout: Duration::from_secs(30),
            local: LocalConfig::default(),
        }
    }
}

impl StoreConfig {
    pub fn redis(url: impl Into<String>) -> Self {
        Self {
            redis_url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn pool_size(mut self, size: u32) -> Self {
        self.pool_size = size;
        self
    }
}

/// Open the store described by `config`
///
/// With a Redis URL this returns a [`DegradingStore`](crate::DegradingStore)
/// over Redis and a fresh local store. If Redis does not answer a ping at
/// startup the breaker starts open, so calls go to the local store until a
/// half-open probe reaches Redis again. Only a missing or unparseable URL
/// runs the process on the local store alone.
/// Never fails: a missing remote is a degraded mode, not an error.
pub async fn connect(config: &StoreConfig) -> Arc<dyn StoreBackend> {
    connect_with_metrics(config, Arc::new(NoopMetrics)).await
}

/// [`connect`] reporting fallbacks to `metrics`
pub async fn connect_with_metrics(
    config: &StoreConfig,
    metrics: Arc<dyn ServiceMetrics>,
) -> Arc<dyn StoreBackend> {
    let local = LocalStore::new(config.local.clone());

    let Some(url) = config.redis_url.as_deref() else {
        info!("No Redis URL configured, using in-process store");
        return Arc::new(local);
    };

    #[cfg(feature = "redis")]
    {
        use crate::degrading::{CircuitBreaker, DegradingStore};
        use crate::redis::{RemoteConfig, RemoteStore};

        let remote_config = RemoteConfig::new(url)
            .pool_size(config.pool_size)
            .connection_timeout(config.connection_timeout);

        let remote = match RemoteStore::new(remote_config).await {
            Ok(remote) => remote,
            Err(err) => {
                warn!(error = %err, "Invalid Redis configuration, using in-process store");
                return Arc::new(local);
            }
        };

        let breaker = CircuitBreaker::new(config.failure_threshold, config.reset_timeout);
        match remote.ping().await {
            Ok(()) => info!(pool_size = config.pool_size, "Connected to Redis"),
            Err(err) => {
                warn!(
                    error = %err,
                    retry_after = ?config.reset_timeout,
                    "Redis unreachable at startup, degrading to in-process store"
                );
                metrics.record_store_fallback("startup_ping");
                breaker.trip();
            }
        }
        Arc::new(DegradingStore::new(remote, local, breaker).with_metrics(metrics))
    }

    #[cfg(not(feature = "redis"))]
    {
        let _ = metrics;
        warn!(url, "Built without the redis feature, using in-process store");
        Arc::new(local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_url_is_local() {
        let store = connect(&StoreConfig::default()).await;
        assert_eq!(store.name(), "local");
        assert!(store.ping().await.is_ok());
    }

    #[cfg(feature = "redis")]
    #[tokio::test]
    async fn test_unreachable_redis_keeps_remote_behind_breaker() {
        let mut config = StoreConfig::redis("redis://127.0.0.1:1");
        config.connection_timeout = Duration::from_millis(200);

        let store = connect(&config).await;
        assert_eq!(store.name(), "degrading");
        assert!(store.ping().await.is_err());

        // Writes land in the local fallback while Redis is down
        store.set("k", b"v".to_vec(), Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"v".to_vec()));
        let counted = store.incr_window("ratelimit:x", Duration::from_secs(60)).await.unwrap();
        assert_eq!(counted.count, 1);
    }

    #[cfg(feature = "redis")]
    #[tokio::test]
    async fn test_invalid_redis_url_is_local() {
        let store = connect(&StoreConfig::redis("not a url")).await;
        assert_eq!(store.name(), "local");
    }
}
