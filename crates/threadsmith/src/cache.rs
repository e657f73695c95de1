//! Response cache keyed by request fingerprint

use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use threadsmith_core::{
    CacheRecord, Clock, JsonSerializer, NoopMetrics, Result, Serializer, ServiceMetrics, Stage,
    StoreBackend, SystemClock, RECORD_VERSION,
};

use crate::fingerprint::Fingerprint;

/// Configuration for [`ResponseCache`]
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL used when `put` is not given one
    pub default_ttl: Duration,
    /// No entry outlives this
    pub max_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(24 * 3600),
            max_ttl: Duration::from_secs(168 * 3600),
        }
    }
}

/// Cache of generated responses
///
/// Entries are wrapped in a [`CacheRecord`]; the bookkeeping fields are
/// stripped before a payload is handed back. Concurrent misses on the same
/// fingerprint are not coalesced: each caller generates and stores its own
/// copy.
pub struct ResponseCache<S = JsonSerializer>
where
    S: Serializer,
{
    store: Arc<dyn StoreBackend>,
    serializer: S,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    metrics: Arc<dyn ServiceMetrics>,
}

impl ResponseCache<JsonSerializer> {
    pub fn new(store: Arc<dyn StoreBackend>, config: CacheConfig) -> Self {
        Self::with_serializer(store, JsonSerializer, config)
    }
}

impl<S: Serializer> ResponseCache<S> {
    pub fn with_serializer(store: Arc<dyn StoreBackend>, serializer: S, config: CacheConfig) -> Self {
        Self {
            store,
            serializer,
            config,
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

    /// Requested TTL bounded by `max_ttl`
    pub fn effective_ttl(&self, ttl: Option<Duration>) -> Duration {
        ttl.unwrap_or(self.config.default_ttl)
            .min(self.config.max_ttl)
            .max(Duration::from_secs(1))
    }

    /// Look up a payload
    ///
    /// Records that cannot be decoded, or were written by a newer schema, are
    /// deleted and reported as a miss.
    pub async fn get<T>(&self, fingerprint: &Fingerprint) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let start = Instant::now();
        let key = fingerprint.cache_key();

        let Some(bytes) = self.store.get(&key).await? else {
            debug!(fingerprint = fingerprint.short(), "Cache miss");
            self.metrics.record_cache_miss(fingerprint.as_str());
            return Ok(None);
        };

        let record: CacheRecord<T> = match self.serializer.deserialize_versioned(&bytes) {
            Ok(record) => record,
            Err(err) => {
                warn!(
                    fingerprint = fingerprint.short(),
                    error = %err,
                    "Dropping unreadable cache record"
                );
                self.store.delete(&key).await?;
                self.metrics.record_cache_miss(fingerprint.as_str());
                return Ok(None);
            }
        };

        // The store TTL normally evicts first; this covers clock skew between writers
        if record.is_expired_at(self.clock.now()) {
            self.store.delete(&key).await?;
            self.metrics.record_cache_miss(fingerprint.as_str());
            return Ok(None);
        }

        debug!(fingerprint = fingerprint.short(), "Cache hit");
        self.metrics.record_cache_hit(fingerprint.as_str());
        self.metrics.record_latency(Stage::CacheLookup, start.elapsed());
        Ok(Some(record.into_payload()))
    }

    /// Store a payload; `ttl` defaults to the configured lifetime
    pub async fn put<T>(&self, fingerprint: &Fingerprint, payload: &T, ttl: Option<Duration>) -> Result<()>
    where
        T: Serialize,
    {
        let start = Instant::now();
        let ttl = self.effective_ttl(ttl);
        let record = CacheRecord {
            version: RECORD_VERSION,
            payload,
            cached_at: self.clock.now(),
            ttl_secs: ttl.as_secs(),
        };

        let bytes = self.serializer.serialize(&record)?;
        self.store.set(&fingerprint.cache_key(), bytes, ttl).await?;

        debug!(
            fingerprint = fingerprint.short(),
            ttl_secs = ttl.as_secs(),
            "Response cached"
        );
        self.metrics.record_latency(Stage::CacheStore, start.elapsed());
        Ok(())
    }

    /// Remove an entry; true if one existed
    pub async fn clear(&self, fingerprint: &Fingerprint) -> Result<bool> {
        self.store.delete(&fingerprint.cache_key()).await
    }
}
