//! Store statistics

/// Statistics for store operations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of read operations (get / counters)
    pub reads: u64,
    /// Number of write operations (set / incr / batch)
    pub writes: u64,
    /// Number of delete operations
    pub deletes: u64,
    /// Operations re-routed to the local fallback
    pub fallbacks: u64,
    /// Operations that returned an error
    pub errors: u64,
    /// Entries currently held (local stores only)
    pub entries: usize,
}

impl StoreStats {
    /// Total operations attempted
    pub fn total_operations(&self) -> u64 {
        self.reads + self.writes + self.deletes
    }

    /// Share of operations served by the fallback (0.0 to 1.0)
    pub fn fallback_ratio(&self) -> f64 {
        let total = self.total_operations();
        if total == 0 {
            0.0
        } else {
            self.fallbacks as f64 / total as f64
        }
    }

    /// Merge stats from another instance
    pub fn merge(&mut self, other: &StoreStats) {
        self.reads += other.reads;
        self.writes += other.writes;
        self.deletes += other.deletes;
        self.fallbacks += other.fallbacks;
        self.errors += other.errors;
        self.entries = other.entries;
    }
}
