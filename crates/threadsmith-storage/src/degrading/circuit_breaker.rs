use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};

use threadsmith_core::StoreError;

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Closed,
    Open(Instant), // Instant when it opened
    HalfOpen,
}

#[derive(Debug)]
struct Inner {
    state: State,
    failures: u32,
}

/// Breaker guarding calls to the remote store
///
/// After `failure_threshold` consecutive failures the breaker opens and calls
/// skip the remote entirely until `reset_timeout` has passed; the next call is
/// then let through as a probe.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    inner: Arc<RwLock<Inner>>,
    failure_threshold: u32,
    reset_timeout: Duration,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                state: State::Closed,
                failures: 0,
            })),
            failure_threshold: failure_threshold.max(1),
            reset_timeout,
        }
    }

    /// Check if we can execute a request
    pub fn allow_request(&self) -> bool {
        let mut inner = self.inner.write();
        match inner.state {
            State::Closed => true,
            State::Open(opened_at) => {
                if opened_at.elapsed() >= self.reset_timeout {
                    inner.state = State::HalfOpen;
                    true
                } else {
                    false
                }
            }
            // Concurrent probes are allowed; the first failure reopens
            State::HalfOpen => true,
        }
    }

    /// Report success
    pub fn report_success(&self) {
        let mut inner = self.inner.write();
        inner.state = State::Closed;
        inner.failures = 0;
    }

    /// Report failure
    pub fn report_failure(&self) {
        let mut inner = self.inner.write();
        match inner.state {
            State::Closed => {
                inner.failures += 1;
                if inner.failures >= self.failure_threshold {
                    inner.state = State::Open(Instant::now());
                }
            }
            State::HalfOpen => {
                inner.state = State::Open(Instant::now());
            }
            State::Open(_) => {}
        }
    }

    /// Open immediately, regardless of the failure count
    pub fn trip(&self) {
        let mut inner = self.inner.write();
        inner.failures = self.failure_threshold;
        inner.state = State::Open(Instant::now());
    }

    /// Whether calls are currently being kept away from the remote
    pub fn is_open(&self) -> bool {
        matches!(self.inner.read().state, State::Open(_))
    }

    /// Helper to classify if an error should trip the breaker
    pub fn is_failure(err: &StoreError) -> bool {
        err.is_unavailable()
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(30))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trips_after_threshold() {
        let breaker = CircuitBreaker::new(2, Duration::from_secs(60));
        breaker.report_failure();
        assert!(breaker.allow_request());
        breaker.report_failure();
        assert!(breaker.is_open());
        assert!(!breaker.allow_request());
    }

    #[test]
    fn test_success_resets_failures() {
        let breaker = CircuitBreaker::new(2, Duration::from_secs(60));
        breaker.report_failure();
        breaker.report_success();
        breaker.report_failure();
        assert!(!breaker.is_open());
    }

    #[test]
    fn test_half_open_probe() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(0));
        breaker.report_failure();
        assert!(breaker.is_open());

        // Reset timeout elapsed: one probe goes through
        assert!(breaker.allow_request());
        breaker.report_failure();
        assert!(breaker.is_open());

        assert!(breaker.allow_request());
        breaker.report_success();
        assert!(!breaker.is_open());
    }

    #[test]
    fn test_trip_opens_then_probes() {
        let breaker = CircuitBreaker::new(5, Duration::from_millis(0));
        breaker.trip();
        assert!(breaker.is_open());

        assert!(breaker.allow_request());
        breaker.report_success();
        assert!(!breaker.is_open());
    }

    #[test]
    fn test_data_errors_do_not_trip() {
        assert!(CircuitBreaker::is_failure(&StoreError::Timeout));
        assert!(!CircuitBreaker::is_failure(&StoreError::Deserialization(
            "bad".into()
        )));
    }
}
