//! threadsmith-core: Core traits and types for the threadsmith services
//!
//! This crate provides the store abstraction, the versioned records kept in it,
//! the key namespace and the observability traits shared by every other crate
//! in the workspace.

mod error;
mod traits;
mod types;

pub use error::{Result, StoreError};
pub use traits::*;
pub use types::*;
