//! threadsmith-storage: store backends for threadsmith
//!
//! - [`LocalStore`]: in-process map, always available
//! - [`RemoteStore`]: Redis behind a `bb8` pool (feature `redis`)
//! - [`DegradingStore`]: remote first, local when the remote is down
//!
//! [`connect`] picks the right combination from a [`StoreConfig`].

mod connect;
pub mod degrading;
pub mod memory;

#[cfg(feature = "redis")]
pub mod redis;

pub use connect::{connect, connect_with_metrics, StoreConfig};
pub use degrading::{CircuitBreaker, DegradingStore, StoreMode};
pub use memory::{LocalConfig, LocalStore};

#[cfg(feature = "redis")]
pub use redis::{RemoteConfig, RemoteStore};
