use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use bb8_redis::RedisConnectionManager;
use parking_lot::RwLock as SyncRwLock;
use redis::{AsyncCommands, RedisError};
use std::sync::Arc;
use std::time::Duration;

use threadsmith_core::{BatchOp, Result, StoreBackend, StoreError, StoreStats, WindowCount};

use super::config::RemoteConfig;
use crate::memory::MIN_TTL;

/// Redis-backed store
///
/// Counters and records are shared by every process pointing at the same
/// Redis, so quotas hold across instances. The `bb8` pool is process-wide and
/// bounds how many store calls are in flight at once.
#[derive(Clone)]
pub struct RemoteStore {
    pool: Pool<RedisConnectionManager>,
    config: RemoteConfig,
    stats: Arc<SyncRwLock<StoreStats>>,
}

/// Map a Redis error onto the store taxonomy
fn backend_error(err: RedisError) -> StoreError {
    if err.is_timeout() {
        StoreError::Timeout
    } else if err.is_connection_dropped() || err.is_connection_refusal() || err.is_io_error() {
        StoreError::Connection(err.to_string())
    } else {
        StoreError::Backend(err.to_string())
    }
}

fn ttl_secs(ttl: Duration) -> u64 {
    ttl.max(MIN_TTL).as_secs()
}

impl RemoteStore {
    /// Create a new remote store
    ///
    /// Building the pool does not open a connection; call [`StoreBackend::ping`]
    /// to find out whether Redis is reachable.
    pub async fn new(config: RemoteConfig) -> Result<Self> {
        let manager = RedisConnectionManager::new(config.url.as_str())
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let pool = Pool::builder()
            .max_size(config.pool_size)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(Self {
            pool,
            config,
            stats: Arc::new(SyncRwLock::new(StoreStats::default())),
        })
    }

    /// Get prefix for a key
    fn prefixed_key(&self, key: &str) -> String {
        match &self.config.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }

    /// Get connection from pool
    async fn get_connection(&self) -> Result<PooledConnection<'_, RedisConnectionManager>> {
        self.pool.get().await.map_err(|e| {
            self.stats.write().errors += 1;
            StoreError::Connection(e.to_string())
        })
    }

    fn failed(&self, err: RedisError) -> StoreError {
        self.stats.write().errors += 1;
        backend_error(err)
    }
}

#[async_trait]
impl StoreBackend for RemoteStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.get_connection().await?;
        let prefixed = self.prefixed_key(key);

        let bytes: Option<Vec<u8>> = conn.get(&prefixed).await.map_err(|e| self.failed(e))?;

        self.stats.write().reads += 1;
        Ok(bytes)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let mut conn = self.get_connection().await?;
        let prefixed = self.prefixed_key(key);

        let _: () = conn
            .set_ex(&prefixed, value, ttl_secs(ttl))
            .await
            .map_err(|e| self.failed(e))?;

        self.stats.write().writes += 1;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.get_connection().await?;
        let prefixed = self.prefixed_key(key);

        let deleted: bool = conn.del(&prefixed).await.map_err(|e| self.failed(e))?;

        self.stats.write().deletes += 1;
        Ok(deleted)
    }

    async fn incr_window(&self, key: &str, window: Duration) -> Result<WindowCount> {
        let mut conn = self.get_connection().await?;
        let prefixed = self.prefixed_key(key);

        // INCR, expire only if no TTL is set yet, read TTL: one MULTI/EXEC round trip
        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.cmd("INCR").arg(&prefixed);
        pipe.cmd("EXPIRE")
            .arg(&prefixed)
            .arg(ttl_secs(window))
            .arg("NX")
            .ignore();
        pipe.cmd("TTL").arg(&prefixed);

        let (count, ttl): (u64, i64) = pipe
            .query_async(&mut *conn)
            .await
            .map_err(|e| self.failed(e))?;

        self.stats.write().writes += 1;

        // A negative TTL means the key has no expiry; report the full window
        let ttl = u64::try_from(ttl).map_or(window, Duration::from_secs);
        Ok(WindowCount { count, ttl })
    }

    async fn apply_batch(&self, ops: &[BatchOp]) -> Result<Vec<u64>> {
        if ops.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.get_connection().await?;
        let mut pipe = redis::pipe();
        pipe.atomic();

        for op in ops {
            let prefixed = self.prefixed_key(op.key());
            match op {
                BatchOp::Incr { ttl, .. } => {
                    pipe.cmd("INCR").arg(&prefixed);
                    pipe.cmd("EXPIRE")
                        .arg(&prefixed)
                        .arg(ttl_secs(*ttl))
                        .arg("NX")
                        .ignore();
                }
                BatchOp::Put { value, ttl, .. } => {
                    pipe.set_ex(&prefixed, value.as_slice(), ttl_secs(*ttl))
                        .ignore();
                }
            }
        }

        let counts: Vec<u64> = pipe
            .query_async(&mut *conn)
            .await
            .map_err(|e| self.failed(e))?;

        self.stats.write().writes += ops.len() as u64;
        Ok(counts)
    }

    async fn get_counters(&self, keys: &[&str]) -> Result<Vec<u64>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.get_connection().await?;
        let prefixed_keys: Vec<String> = keys.iter().map(|k| self.prefixed_key(k)).collect();

        // Explicit MGET: the `mget` helper sends GET for a single key
        let raw: Vec<Option<u64>> = redis::cmd("MGET")
            .arg(&prefixed_keys)
            .query_async(&mut *conn)
            .await
            .map_err(|e| self.failed(e))?;

        self.stats.write().reads += keys.len() as u64;
        Ok(raw.into_iter().map(|v| v.unwrap_or(0)).collect())
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.get_connection().await?;
        let _: String = redis::cmd("PING")
            .query_async(&mut *conn)
            .await
            .map_err(|e| self.failed(e))?;
        Ok(())
    }

    fn stats(&self) -> StoreStats {
        self.stats.read().clone()
    }
}
