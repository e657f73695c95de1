//! Backing store trait

use async_trait::async_trait;
use std::time::Duration;

use crate::{BatchOp, StoreError, StoreStats, WindowCount};

/// Core trait for all backing stores
///
/// Quota counters, rate windows, premium grants and cached responses all live
/// behind this trait. Every write carries a TTL: nothing stored here is meant
/// to be durable. Implementations live in `threadsmith-storage`: the in-process
/// `LocalStore`, the Redis-backed `RemoteStore` and `DegradingStore` on top.
#[async_trait]
pub trait StoreBackend: Send + Sync + 'static {
    /// Short backend name used in logs
    fn name(&self) -> &'static str;

    /// Get raw bytes for a key
    ///
    /// Returns `None` if the key doesn't exist or has expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Store raw bytes with a TTL, replacing any previous value
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), StoreError>;

    /// Delete a key
    ///
    /// Returns `true` if the key existed and was deleted.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Fixed-window increment
    ///
    /// Increments the counter at `key`, sets its expiry to `window` only when the
    /// counter was just created, then reads back the count and remaining TTL.
    /// All three steps happen in one atomic round trip.
    async fn incr_window(&self, key: &str, window: Duration) -> Result<WindowCount, StoreError>;

    /// Apply a batch of writes atomically
    ///
    /// Returns the post-increment value of every [`BatchOp::Incr`], in op order.
    async fn apply_batch(&self, ops: &[BatchOp]) -> Result<Vec<u64>, StoreError>;

    /// Read several counters at once; missing counters read as zero
    async fn get_counters(&self, keys: &[&str]) -> Result<Vec<u64>, StoreError>;

    /// Check that the store answers
    async fn ping(&self) -> Result<(), StoreError>;

    /// Operation statistics
    fn stats(&self) -> StoreStats;
}

#[async_trait]
impl<T: StoreBackend + ?Sized> StoreBackend for std::sync::Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), StoreError> {
        (**self).set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        (**self).delete(key).await
    }

    async fn incr_window(&self, key: &str, window: Duration) -> Result<WindowCount, StoreError> {
        (**self).incr_window(key, window).await
    }

    async fn apply_batch(&self, ops: &[BatchOp]) -> Result<Vec<u64>, StoreError> {
        (**self).apply_batch(ops).await
    }

    async fn get_counters(&self, keys: &[&str]) -> Result<Vec<u64>, StoreError> {
        (**self).get_counters(keys).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        (**self).ping().await
    }

    fn stats(&self) -> StoreStats {
        (**self).stats()
    }
}
