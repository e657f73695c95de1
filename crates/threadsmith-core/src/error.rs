//! Error types for store operations

use thiserror::Error;

/// Main error type for all backing-store operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Backend connection failed
    #[error("connection error: {0}")]
    Connection(String),

    /// Backend operation failed
    #[error("backend error: {0}")]
    Backend(String),

    /// Serialization failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization failed
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Stored record was written by a newer schema
    #[error("unsupported record version {found} (max {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// Invalid argument passed to the store
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),

    /// Timeout
    #[error("operation timed out")]
    Timeout,
}

impl StoreError {
    /// Whether the error means the backing store itself is unreachable or failing,
    /// as opposed to bad data or a bad call.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            StoreError::Connection(_)
                | StoreError::Backend(_)
                | StoreError::Timeout
                | StoreError::Internal(_)
        )
    }
}

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;
