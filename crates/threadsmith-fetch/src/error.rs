//! Error types for article fetching

use thiserror::Error;

/// Result type for fetch operations
pub type Result<T> = std::result::Result<T, FetchError>;

/// Everything that can go wrong between a URL and an extracted article
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// Scheme, allow-list or resolved-address check failed
    #[error("request rejected: {0}")]
    SecurityRejection(String),

    #[error("connection timed out")]
    ConnectTimeout,

    #[error("read timed out")]
    ReadTimeout,

    /// Connection refused, reset, TLS handshake failure and friends
    #[error("transport error: {0}")]
    Transport(String),

    #[error("upstream returned status {0}")]
    UpstreamStatus(u16),

    /// Paywall or login wall
    #[error("content is behind a login or paywall")]
    Forbidden,

    #[error("content too short ({length} < {minimum} chars)")]
    ContentTooShort { length: usize, minimum: usize },

    #[error("no article content found: {0}")]
    ExtractionFailure(String),

    #[error("could not parse response: {0}")]
    ParseFailure(String),
}

impl FetchError {
    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::ConnectTimeout | FetchError::ReadTimeout)
    }

    /// Whether this is a network level failure
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            FetchError::ConnectTimeout | FetchError::ReadTimeout | FetchError::Transport(_)
        )
    }

    /// Message safe to show to the person who submitted the URL
    pub fn user_message(&self) -> String {
        match self {
            FetchError::InvalidUrl(_) => "The URL is not valid".to_string(),
            FetchError::SecurityRejection(reason) => format!("URL not allowed: {reason}"),
            FetchError::ConnectTimeout | FetchError::ReadTimeout => {
                "The source site took too long to respond".to_string()
            }
            FetchError::Transport(_) => "Could not connect to the source site".to_string(),
            FetchError::UpstreamStatus(code) => {
                format!("Could not fetch article: {}", status_category(*code))
            }
            FetchError::Forbidden => {
                "This article requires a login or subscription".to_string()
            }
            FetchError::ContentTooShort { .. } => {
                "Not enough article text could be extracted".to_string()
            }
            FetchError::ExtractionFailure(_) => {
                "No article content could be found on the page".to_string()
            }
            FetchError::ParseFailure(_) => "The page could not be read".to_string(),
        }
    }
}

/// User-facing category for an upstream HTTP status
pub fn status_category(code: u16) -> &'static str {
    match code {
        401 | 403 => "access blocked",
        404 | 410 => "article not found",
        429 => "rate limited upstream",
        300..=399 => "redirect not followed",
        500..=599 => "source site error",
        _ => "unexpected response",
    }
}
