//! Fixed-window counter results

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw result of a fixed-window increment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCount {
    /// Counter value after the increment
    pub count: u64,
    /// Time until the window resets
    pub ttl: Duration,
}

/// A fixed-window counter evaluated against its limit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateWindow {
    /// Whether this request fits in the window
    pub allowed: bool,
    /// Requests counted in the current window, including this one
    pub used: u64,
    /// Requests left in the window
    pub remaining: u64,
    /// Seconds until the window resets
    pub reset_seconds: u64,
    /// Window ceiling
    pub limit: u64,
}

impl RateWindow {
    /// Evaluate a counter against `limit`
    ///
    /// `allowed` is `used <= limit`, so the request that reaches the limit still
    /// passes and the next one is rejected.
    pub fn evaluate(count: WindowCount, limit: u64) -> Self {
        Self {
            allowed: count.count <= limit,
            used: count.count,
            remaining: limit.saturating_sub(count.count),
            reset_seconds: count.ttl.as_secs(),
            limit,
        }
    }

    /// Decision used when the store cannot answer: let the request through
    pub fn fail_open(limit: u64, window: Duration) -> Self {
        Self {
            allowed: true,
            used: 0,
            remaining: limit,
            reset_seconds: window.as_secs(),
            limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(n: u64) -> WindowCount {
        WindowCount {
            count: n,
            ttl: Duration::from_secs(30),
        }
    }

    #[test]
    fn test_at_limit_is_allowed() {
        let window = RateWindow::evaluate(count(5), 5);
        assert!(window.allowed);
        assert_eq!(window.remaining, 0);
        assert_eq!(window.reset_seconds, 30);
    }

    #[test]
    fn test_over_limit_is_rejected() {
        let window = RateWindow::evaluate(count(6), 5);
        assert!(!window.allowed);
        assert_eq!(window.used, 6);
        assert_eq!(window.remaining, 0);
    }

    #[test]
    fn test_fail_open() {
        let window = RateWindow::fail_open(10, Duration::from_secs(3600));
        assert!(window.allowed);
        assert_eq!(window.remaining, 10);
        assert_eq!(window.reset_seconds, 3600);
    }
}
