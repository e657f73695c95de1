//! Batch write operations

use std::time::Duration;

/// One write inside an atomic batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    /// Increment a counter; `ttl` is applied only when the counter is created
    Incr { key: String, ttl: Duration },
    /// Store a value, replacing any previous one
    Put {
        key: String,
        value: Vec<u8>,
        ttl: Duration,
    },
}

impl BatchOp {
    /// Counter increment
    pub fn incr(key: impl Into<String>, ttl: Duration) -> Self {
        BatchOp::Incr {
            key: key.into(),
            ttl,
        }
    }

    /// Value write
    pub fn put(key: impl Into<String>, value: Vec<u8>, ttl: Duration) -> Self {
        BatchOp::Put {
            key: key.into(),
            value,
            ttl,
        }
    }

    /// Target key
    pub fn key(&self) -> &str {
        match self {
            BatchOp::Incr { key, .. } | BatchOp::Put { key, .. } => key,
        }
    }

    /// TTL carried by the op
    pub fn ttl(&self) -> Duration {
        match self {
            BatchOp::Incr { ttl, .. } | BatchOp::Put { ttl, .. } => *ttl,
        }
    }

    /// Whether the op yields a counter value
    pub fn is_incr(&self) -> bool {
        matches!(self, BatchOp::Incr { .. })
    }
}

/// Builder collecting batch operations
#[derive(Debug, Clone, Default)]
pub struct Batch(Vec<BatchOp>);

impl Batch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a counter increment
    pub fn incr(mut self, key: impl Into<String>, ttl: Duration) -> Self {
        self.0.push(BatchOp::incr(key, ttl));
        self
    }

    /// Add a value write
    pub fn put(mut self, key: impl Into<String>, value: Vec<u8>, ttl: Duration) -> Self {
        self.0.push(BatchOp::put(key, value, ttl));
        self
    }

    /// Number of ops
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the batch is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Build the op list
    pub fn build(self) -> Vec<BatchOp> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_default() {
        let ops = Batch::new().build();
        assert!(ops.is_empty());
    }

    #[test]
    fn test_builder_fluent() {
        let day = Duration::from_secs(86_400);
        let batch = Batch::new()
            .incr("usage:ip:1.2.3.4:daily:2026-10-18", day)
            .put("usage:event:x", b"{}".to_vec(), day);

        assert_eq!(batch.len(), 2);
        let ops = batch.build();
        assert!(ops[0].is_incr());
        assert!(!ops[1].is_incr());
        assert_eq!(ops[1].key(), "usage:event:x");
        assert_eq!(ops[0].ttl(), day);
    }
}
