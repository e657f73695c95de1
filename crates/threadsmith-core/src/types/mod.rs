//! Core types for store operations

mod entry;
mod options;
mod result;
mod stats;

pub use entry::{
    CacheRecord, GrantSource, PremiumGrant, RECORD_VERSION, UsageEvent, Versioned,
};
pub use options::{Batch, BatchOp};
pub use result::{RateWindow, WindowCount};
pub use stats::StoreStats;
