//! Precomputed attempt plan for fetching a URL

use rand::Rng;
use std::time::Duration;

/// One request attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    /// 1-based attempt number, for logging
    pub number: u32,
    pub verify_tls: bool,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    /// Sleep before sending this attempt
    pub delay: Duration,
}

/// Retry settings
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Backoff before attempt `number` (1-based); the first attempt has none
    pub fn delay_for(&self, number: u32) -> Duration {
        if number <= 1 {
            return Duration::ZERO;
        }
        let exponent = (number - 2).min(16);
        let delay = self.base_delay.saturating_mul(1u32 << exponent).min(self.max_delay);
        if self.jitter {
            let factor = rand::rng().random_range(0.5..1.5);
            delay.mul_f64(factor).min(self.max_delay)
        } else {
            delay
        }
    }
}

/// Ordered attempts consumed top-down
///
/// `attempts` all verify TLS. `tls_fallback` is the single unverified attempt
/// that may run when the first attempt fails certificate verification; its
/// outcome is final.
#[derive(Debug, Clone)]
pub struct AttemptPlan {
    pub attempts: Vec<Attempt>,
    pub tls_fallback: Attempt,
}

impl AttemptPlan {
    pub fn from_config(config: &RetryConfig) -> Self {
        let attempts = (1..=config.max_attempts.max(1))
            .map(|number| Attempt {
                number,
                verify_tls: true,
                connect_timeout: config.connect_timeout,
                read_timeout: config.read_timeout,
                delay: config.delay_for(number),
            })
            .collect();

        Self {
            attempts,
            tls_fallback: Attempt {
                number: 2,
                verify_tls: false,
                connect_timeout: config.connect_timeout,
                read_timeout: config.read_timeout,
                delay: Duration::ZERO,
            },
        }
    }

    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_jitter() -> RetryConfig {
        RetryConfig {
            jitter: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_plan_shape() {
        let plan = AttemptPlan::from_config(&no_jitter());
        assert_eq!(plan.len(), 3);
        assert!(plan.attempts.iter().all(|a| a.verify_tls));
        assert!(!plan.tls_fallback.verify_tls);
        assert_eq!(
            plan.attempts.iter().map(|a| a.number).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_exponential_backoff() {
        let config = no_jitter();
        assert_eq!(config.delay_for(1), Duration::ZERO);
        assert_eq!(config.delay_for(2), Duration::from_millis(500));
        assert_eq!(config.delay_for(3), Duration::from_secs(1));
        assert_eq!(config.delay_for(4), Duration::from_secs(2));
        assert_eq!(config.delay_for(30), Duration::from_secs(8));
    }

    #[test]
    fn test_jitter_stays_bounded() {
        let config = RetryConfig::default();
        for _ in 0..100 {
            let delay = config.delay_for(2);
            assert!(delay >= Duration::from_millis(250));
            assert!(delay <= Duration::from_millis(750));
        }
    }

    #[test]
    fn test_at_least_one_attempt() {
        let config = RetryConfig {
            max_attempts: 0,
            ..no_jitter()
        };
        assert_eq!(AttemptPlan::from_config(&config).len(), 1);
    }
}
