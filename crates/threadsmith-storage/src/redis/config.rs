//! Configuration for the Redis-backed store

use std::time::Duration;

/// Configuration for the remote store connection
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,

    /// Connection pool size; bounds concurrent store calls
    pub pool_size: u32,

    /// Time allowed to check a connection out of the pool
    pub connection_timeout: Duration,

    /// Optional key prefix for all keys (e.g., "threadsmith")
    pub key_prefix: Option<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            pool_size: 10,
            connection_timeout: Duration::from_secs(2),
            key_prefix: None,
        }
    }
}

impl RemoteConfig {
    /// Create new config with URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set pool size
    pub fn pool_size(mut self, size: u32) -> Self {
        self.pool_size = size;
        self
    }

    /// Set key prefix
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Set connection checkout timeout
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }
}
