//! Remote store with a circuit-broken local fallback

mod backend;
mod circuit_breaker;

pub use backend::{DegradingStore, StoreMode};
pub use circuit_breaker::CircuitBreaker;
