//! Errors returned by the generation pipeline

use serde::{Deserialize, Serialize};
use thiserror::Error;

use threadsmith_core::{RateWindow, StoreError};
use threadsmith_fetch::{status_category, FetchError};

use crate::quota::UsageSummary;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, GenerateError>;

/// Why a generation request failed
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerateError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("rate limit exceeded, retry in {}s", decision.reset_seconds)]
    RateLimited { decision: RateWindow },

    #[error("{0}")]
    SecurityRejection(String),

    #[error("{0}")]
    NetworkFailure(String),

    #[error("could not fetch article: {category}")]
    UpstreamStatus { code: u16, category: &'static str },

    #[error("{0}")]
    ExtractionFailure(String),

    #[error("free tier limit reached")]
    QuotaExceeded { usage: UsageSummary },

    #[error("usage store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}

impl GenerateError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            GenerateError::InvalidRequest(_) => "INVALID_REQUEST",
            GenerateError::RateLimited { .. } => "RATE_LIMITED",
            GenerateError::SecurityRejection(_) => "SECURITY_REJECTION",
            GenerateError::NetworkFailure(_) => "NETWORK_FAILURE",
            GenerateError::UpstreamStatus { .. } => "UPSTREAM_STATUS",
            GenerateError::ExtractionFailure(_) => "EXTRACTION_FAILURE",
            GenerateError::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
            GenerateError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
        }
    }

    /// HTTP status an entry layer should answer with
    pub fn http_status(&self) -> u16 {
        match self {
            GenerateError::InvalidRequest(_) | GenerateError::SecurityRejection(_) => 400,
            GenerateError::QuotaExceeded { .. } => 402,
            GenerateError::ExtractionFailure(_) => 422,
            GenerateError::RateLimited { .. } => 429,
            GenerateError::NetworkFailure(_) => 504,
            GenerateError::UpstreamStatus { .. } => 502,
            GenerateError::StoreUnavailable(_) => 503,
        }
    }

    /// Message for the end user; store internals are never exposed
    pub fn user_message(&self) -> String {
        match self {
            GenerateError::StoreUnavailable(_) => {
                "Service temporarily unavailable, please try again".to_string()
            }
            other => other.to_string(),
        }
    }

    /// Serializable failure envelope
    pub fn to_failure(&self) -> FailureResponse {
        let (usage, retry_after) = match self {
            GenerateError::QuotaExceeded { usage } => (Some(usage.clone()), None),
            GenerateError::RateLimited { decision } => (None, Some(decision.reset_seconds)),
            _ => (None, None),
        };
        FailureResponse {
            success: false,
            error: self.user_message(),
            code: self.code().to_string(),
            usage,
            retry_after,
        }
    }
}

impl From<FetchError> for GenerateError {
    fn from(err: FetchError) -> Self {
        let message = err.user_message();
        match err {
            FetchError::InvalidUrl(_) => GenerateError::InvalidRequest(message),
            FetchError::SecurityRejection(_) => GenerateError::SecurityRejection(message),
            FetchError::ConnectTimeout | FetchError::ReadTimeout | FetchError::Transport(_) => {
                GenerateError::NetworkFailure(message)
            }
            FetchError::UpstreamStatus(code) => GenerateError::UpstreamStatus {
                code,
                category: status_category(code),
            },
            FetchError::Forbidden
            | FetchError::ContentTooShort { .. }
            | FetchError::ExtractionFailure(_)
            | FetchError::ParseFailure(_) => GenerateError::ExtractionFailure(message),
        }
    }
}

/// Body returned for a failed request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}
