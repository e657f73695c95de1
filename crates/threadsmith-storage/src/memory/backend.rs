//! In-process store guarded by a single mutex

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use threadsmith_core::{BatchOp, Result, StoreBackend, StoreError, StoreStats, WindowCount};

/// Smallest TTL accepted by any write
pub(crate) const MIN_TTL: Duration = Duration::from_secs(1);

/// Upper bound that keeps `Instant` arithmetic from overflowing
const LONGEST_TTL: Duration = Duration::from_secs(100 * 365 * 86_400);

/// Configuration for the local store
#[derive(Debug, Clone)]
pub struct LocalConfig {
    /// Maximum number of entries (0 = unlimited)
    pub max_entries: usize,
    /// Longest TTL any entry may carry; longer TTLs are clamped (None = no cap)
    pub max_ttl: Option<Duration>,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            max_entries: 100_000,
            max_ttl: None,
        }
    }
}

impl LocalConfig {
    /// Create config with specific capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            max_entries: capacity,
            ..Default::default()
        }
    }

    /// Create config with unlimited capacity
    pub fn unlimited() -> Self {
        Self {
            max_entries: 0,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
enum SlotValue {
    Bytes(Vec<u8>),
    Counter(u64),
}

#[derive(Debug, Clone)]
struct Slot {
    value: SlotValue,
    expires_at: Instant,
}

impl Slot {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    fn counter(&self) -> Option<u64> {
        match &self.value {
            SlotValue::Counter(n) => Some(*n),
            SlotValue::Bytes(bytes) => std::str::from_utf8(bytes).ok()?.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    slots: HashMap<String, Slot>,
    stats: StoreStats,
}

impl Inner {
    /// Live slot for `key`, dropping it first if it has expired
    fn live(&mut self, key: &str, now: Instant) -> Option<&mut Slot> {
        if self.slots.get(key).is_some_and(|slot| slot.is_expired(now)) {
            self.slots.remove(key);
        }
        self.slots.get_mut(key)
    }

    /// Increment a counter; the TTL is only applied when the counter is created
    fn incr(&mut self, key: &str, ttl: Duration, now: Instant) -> Result<(u64, Instant)> {
        match self.live(key, now) {
            Some(slot) => {
                let next = slot
                    .counter()
                    .ok_or_else(|| {
                        StoreError::InvalidArgument(format!("value at {key} is not a counter"))
                    })?
                    + 1;
                slot.value = SlotValue::Counter(next);
                Ok((next, slot.expires_at))
            }
            None => {
                let expires_at = now + ttl;
                self.slots.insert(
                    key.to_string(),
                    Slot {
                        value: SlotValue::Counter(1),
                        expires_at,
                    },
                );
                Ok((1, expires_at))
            }
        }
    }

    fn is_counter_or_absent(&mut self, key: &str, now: Instant) -> bool {
        self.live(key, now).is_none_or(|slot| slot.counter().is_some())
    }
}

/// In-process store
///
/// All state sits in one `HashMap` behind one mutex, and the lock is never held
/// across an `.await`. Counts are exact within this process only: several
/// instances each keep their own map. Cloning creates a new handle to the SAME
/// underlying map.
#[derive(Clone)]
pub struct LocalStore {
    inner: Arc<Mutex<Inner>>,
    config: LocalConfig,
}

impl LocalStore {
    /// Create a new local store
    pub fn new(config: LocalConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            config,
        }
    }

    /// Create with default configuration
    pub fn with_defaults() -> Self {
        Self::new(LocalConfig::default())
    }

    fn clamp_ttl(&self, ttl: Duration) -> Duration {
        let ceiling = self.config.max_ttl.unwrap_or(LONGEST_TTL).clamp(MIN_TTL, LONGEST_TTL);
        ttl.clamp(MIN_TTL, ceiling)
    }

    /// Make room for one more entry
    fn maybe_evict(&self, inner: &mut Inner, now: Instant) {
        if self.config.max_entries == 0 || inner.slots.len() < self.config.max_entries {
            return;
        }

        inner.slots.retain(|_, slot| !slot.is_expired(now));
        if inner.slots.len() < self.config.max_entries {
            return;
        }

        // Evict the entries closest to expiry
        let excess = inner.slots.len() + 1 - self.config.max_entries;
        let mut by_expiry: Vec<(Instant, String)> = inner
            .slots
            .iter()
            .map(|(key, slot)| (slot.expires_at, key.clone()))
            .collect();
        by_expiry.sort();
        for (_, key) in by_expiry.into_iter().take(excess) {
            inner.slots.remove(&key);
        }
    }

    /// Drop every expired entry and return how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        let before = inner.slots.len();
        inner.slots.retain(|_, slot| !slot.is_expired(now));
        before - inner.slots.len()
    }

    /// Number of entries, expired ones included until they are purged
    pub fn len(&self) -> usize {
        self.inner.lock().slots.len()
    }

    /// Check if the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remaining TTL of a live key
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        inner.live(key, now).map(|slot| slot.expires_at - now)
    }
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[async_trait]
impl StoreBackend for LocalStore {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        inner.stats.reads += 1;
        let value = inner.live(key, now).map(|slot| match &slot.value {
            SlotValue::Bytes(bytes) => bytes.clone(),
            SlotValue::Counter(n) => n.to_string().into_bytes(),
        });
        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let now = Instant::now();
        let ttl = self.clamp_ttl(ttl);
        let mut inner = self.inner.lock();
        if !inner.slots.contains_key(key) {
            self.maybe_evict(&mut inner, now);
        }
        inner.slots.insert(
            key.to_string(),
            Slot {
                value: SlotValue::Bytes(value),
                expires_at: now + ttl,
            },
        );
        inner.stats.writes += 1;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        inner.stats.deletes += 1;
        let existed = inner.live(key, now).is_some();
        inner.slots.remove(key);
        Ok(existed)
    }

    async fn incr_window(&self, key: &str, window: Duration) -> Result<WindowCount> {
        let now = Instant::now();
        let window = self.clamp_ttl(window);
        let mut inner = self.inner.lock();
        if !inner.slots.contains_key(key) {
            self.maybe_evict(&mut inner, now);
        }
        inner.stats.writes += 1;
        let (count, expires_at) = inner.incr(key, window, now)?;
        Ok(WindowCount {
            count,
            ttl: expires_at - now,
        })
    }

    async fn apply_batch(&self, ops: &[BatchOp]) -> Result<Vec<u64>> {
        let now = Instant::now();
        let mut inner = self.inner.lock();

        // Validate before touching anything so the batch applies all-or-nothing
        for op in ops {
            if op.is_incr() && !inner.is_counter_or_absent(op.key(), now) {
                inner.stats.errors += 1;
                return Err(StoreError::InvalidArgument(format!(
                    "value at {} is not a counter",
                    op.key()
                )));
            }
        }

        let mut counts = Vec::with_capacity(ops.len());
        for op in ops {
            if !inner.slots.contains_key(op.key()) {
                self.maybe_evict(&mut inner, now);
            }
            match op {
                BatchOp::Incr { key, ttl } => {
                    let (count, _) = inner.incr(key, self.clamp_ttl(*ttl), now)?;
                    counts.push(count);
                }
                BatchOp::Put { key, value, ttl } => {
                    inner.slots.insert(
                        key.clone(),
                        Slot {
                            value: SlotValue::Bytes(value.clone()),
                            expires_at: now + self.clamp_ttl(*ttl),
                        },
                    );
                }
            }
        }
        inner.stats.writes += ops.len() as u64;
        Ok(counts)
    }

    async fn get_counters(&self, keys: &[&str]) -> Result<Vec<u64>> {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        inner.stats.reads += keys.len() as u64;
        Ok(keys
            .iter()
            .map(|key| {
                inner
                    .live(key, now)
                    .and_then(|slot| slot.counter())
                    .unwrap_or(0)
            })
            .collect())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn stats(&self) -> StoreStats {
        let inner = self.inner.lock();
        StoreStats {
            entries: inner.slots.len(),
            ..inner.stats.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_basic_get_set() {
        let store = LocalStore::with_defaults();

        store.set("key1", b"value1".to_vec(), MINUTE).await.unwrap();

        let result = store.get("key1").await.unwrap();
        assert_eq!(result, Some(b"value1".to_vec()));
    }

    #[tokio::test]
    async fn test_delete() {
        let store = LocalStore::with_defaults();

        store.set("key1", b"value1".to_vec(), MINUTE).await.unwrap();
        assert!(store.delete("key1").await.unwrap());
        assert!(!store.delete("key1").await.unwrap());
        assert!(store.get("key1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let store = LocalStore::with_defaults();
        assert!(store.get("nonexistent").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire() {
        let store = LocalStore::with_defaults();
        store.set("key", b"v".to_vec(), MINUTE).await.unwrap();

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(store.get("key").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(store.get("key").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_expiry_set_only_on_creation() {
        let store = LocalStore::with_defaults();

        let first = store.incr_window("ratelimit:a", MINUTE).await.unwrap();
        assert_eq!(first.count, 1);
        assert_eq!(first.ttl, MINUTE);

        tokio::time::advance(Duration::from_secs(20)).await;
        let second = store.incr_window("ratelimit:a", MINUTE).await.unwrap();
        assert_eq!(second.count, 2);
        assert_eq!(second.ttl, Duration::from_secs(40));

        tokio::time::advance(Duration::from_secs(40)).await;
        let fresh = store.incr_window("ratelimit:a", MINUTE).await.unwrap();
        assert_eq!(fresh.count, 1);
        assert_eq!(fresh.ttl, MINUTE);
    }

    #[tokio::test]
    async fn test_batch_counts_in_op_order() {
        let store = LocalStore::with_defaults();
        let ops = vec![
            BatchOp::incr("a", MINUTE),
            BatchOp::put("detail", b"{}".to_vec(), MINUTE),
            BatchOp::incr("b", MINUTE),
            BatchOp::incr("a", MINUTE),
        ];

        let counts = store.apply_batch(&ops).await.unwrap();
        assert_eq!(counts, vec![1, 1, 2]);
        assert_eq!(store.get_counters(&["a", "b", "c"]).await.unwrap(), vec![2, 1, 0]);
        assert!(store.get("detail").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_batch_is_all_or_nothing() {
        let store = LocalStore::with_defaults();
        store.set("text", b"hello".to_vec(), MINUTE).await.unwrap();

        let ops = vec![BatchOp::incr("a", MINUTE), BatchOp::incr("text", MINUTE)];
        assert!(store.apply_batch(&ops).await.is_err());
        assert_eq!(store.get_counters(&["a"]).await.unwrap(), vec![0]);
    }

    #[tokio::test]
    async fn test_counter_reads_as_decimal_bytes() {
        let store = LocalStore::with_defaults();
        store.incr_window("n", MINUTE).await.unwrap();
        store.incr_window("n", MINUTE).await.unwrap();
        assert_eq!(store.get("n").await.unwrap(), Some(b"2".to_vec()));
    }

    #[tokio::test]
    async fn test_ttl_clamped_to_max() {
        let config = LocalConfig {
            max_ttl: Some(Duration::from_secs(10)),
            ..Default::default()
        };
        let store = LocalStore::new(config);
        store.set("k", b"v".to_vec(), Duration::from_secs(3600)).await.unwrap();
        assert!(store.ttl("k").unwrap() <= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_ttl_kept_by_default() {
        let store = LocalStore::with_defaults();
        let year = Duration::from_secs(372 * 86_400);
        store.set("grant", b"v".to_vec(), year).await.unwrap();
        store
            .apply_batch(&[BatchOp::put("batched", b"v".to_vec(), year)])
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(100 * 86_400)).await;
        assert_eq!(store.ttl("grant"), Some(Duration::from_secs(272 * 86_400)));
        assert_eq!(store.ttl("batched"), Some(Duration::from_secs(272 * 86_400)));
    }

    #[tokio::test]
    async fn test_huge_ttl_does_not_overflow() {
        let store = LocalStore::with_defaults();
        store.set("k", b"v".to_vec(), Duration::MAX).await.unwrap();
        assert!(store.get("k").await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_eviction_prefers_soonest_expiry() {
        let store = LocalStore::new(LocalConfig::with_capacity(2));

        store.set("short", b"1".to_vec(), Duration::from_secs(5)).await.unwrap();
        store.set("long", b"2".to_vec(), Duration::from_secs(500)).await.unwrap();
        store.set("new", b"3".to_vec(), Duration::from_secs(50)).await.unwrap();

        assert_eq!(store.len(), 2);
        assert!(store.get("short").await.unwrap().is_none());
        assert!(store.get("long").await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let store = LocalStore::with_defaults();
        store.set("a", b"1".to_vec(), Duration::from_secs(1)).await.unwrap();
        store.set("b", b"2".to_vec(), MINUTE).await.unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_stats() {
        let store = LocalStore::with_defaults();
        store.set("key1", b"v".to_vec(), MINUTE).await.unwrap();
        store.get("key1").await.unwrap();
        store.get("missing").await.unwrap();

        let stats = store.stats();
        assert_eq!(stats.reads, 2);
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.entries, 1);
    }
}
