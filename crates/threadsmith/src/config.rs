//! Service settings read from the environment

use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use threadsmith_fetch::{FetchConfig, RetryConfig, DEFAULT_ALLOWED_DOMAINS};
use threadsmith_storage::StoreConfig;

use crate::segmenter::{MAX_TWEET_LENGTH, NUMBERING_RESERVE};

const HOUR: u64 = 3600;

/// Invalid configuration value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name}: cannot parse '{value}'")]
    Parse { name: &'static str, value: String },

    #[error("{name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Everything the pipeline can be tuned with
#[derive(Debug, Clone)]
pub struct Settings {
    /// `RATE_LIMIT_REQUESTS`
    pub rate_limit_requests: u64,
    /// `RATE_LIMIT_WINDOW_HOURS`
    pub rate_limit_window: Duration,
    /// `RATE_LIMIT_ENABLED`: run the rate-limit gate before anything else
    pub enforce_rate_limit: bool,
    /// `MAX_TWEET_LENGTH`
    pub max_tweet_length: usize,
    /// `MAX_CONTENT_LENGTH`
    pub max_content_length: usize,
    /// `MIN_CONTENT_LENGTH`
    pub min_content_length: usize,
    /// `CACHE_TTL_HOURS`
    pub cache_ttl: Duration,
    /// `CACHE_MAX_TTL_HOURS`
    pub cache_max_ttl: Duration,
    /// `FREE_TIER_DAILY_LIMIT`
    pub free_tier_daily_limit: u64,
    /// `FREE_TIER_MONTHLY_LIMIT`
    pub free_tier_monthly_limit: u64,
    /// `ALLOWED_DOMAINS`
    pub allowed_domains: Vec<String>,
    /// `REDIS_URL`
    pub redis_url: Option<String>,
    /// `REDIS_POOL_SIZE`
    pub redis_pool_size: u32,
    /// `FETCH_CONNECT_TIMEOUT_SECS`
    pub fetch_connect_timeout: Duration,
    /// `FETCH_READ_TIMEOUT_SECS`
    pub fetch_read_timeout: Duration,
    /// `FETCH_MAX_ATTEMPTS`
    pub fetch_max_attempts: u32,
    /// `AI_TIMEOUT_SECS`
    pub ai_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rate_limit_requests: 10,
            rate_limit_window: Duration::from_secs(HOUR),
            enforce_rate_limit: true,
            max_tweet_length: MAX_TWEET_LENGTH,
            max_content_length: 50_000,
            min_content_length: 200,
            cache_ttl: Duration::from_secs(24 * HOUR),
            cache_max_ttl: Duration::from_secs(168 * HOUR),
            free_tier_daily_limit: 5,
            free_tier_monthly_limit: 50,
            allowed_domains: DEFAULT_ALLOWED_DOMAINS.iter().map(|d| d.to_string()).collect(),
            redis_url: None,
            redis_pool_size: 10,
            fetch_connect_timeout: Duration::from_secs(10),
            fetch_read_timeout: Duration::from_secs(30),
            fetch_max_attempts: 3,
            ai_timeout: Duration::from_secs(30),
        }
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(name) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Parse { name, value: raw }),
    }
}

fn parse_bool(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<bool>, ConfigError> {
    match lookup(name).map(|raw| raw.trim().to_ascii_lowercase()) {
        None => Ok(None),
        Some(raw) => match raw.as_str() {
            "" => Ok(None),
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::Parse { name, value: raw }),
        },
    }
}

fn positive<T: PartialOrd + Default>(name: &'static str, value: T) -> Result<T, ConfigError> {
    if value > T::default() {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            name,
            reason: "must be greater than zero".to_string(),
        })
    }
}

impl Settings {
    /// Read settings from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through `lookup`; unset variables keep their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut settings = Self::default();

        if let Some(v) = parse_var::<u64>(&lookup, "RATE_LIMIT_REQUESTS")? {
            settings.rate_limit_requests = positive("RATE_LIMIT_REQUESTS", v)?;
        }
        if let Some(v) = parse_var::<u64>(&lookup, "RATE_LIMIT_WINDOW_HOURS")? {
            settings.rate_limit_window = hours(positive("RATE_LIMIT_WINDOW_HOURS", v)?);
        }
        if let Some(v) = parse_bool(&lookup, "RATE_LIMIT_ENABLED")? {
            settings.enforce_rate_limit = v;
        }
        if let Some(v) = parse_var::<usize>(&lookup, "MAX_TWEET_LENGTH")? {
            if v <= NUMBERING_RESERVE * 2 {
                return Err(ConfigError::Invalid {
                    name: "MAX_TWEET_LENGTH",
                    reason: format!("must be greater than {}", NUMBERING_RESERVE * 2),
                });
            }
            settings.max_tweet_length = v;
        }
        if let Some(v) = parse_var::<usize>(&lookup, "MAX_CONTENT_LENGTH")? {
            settings.max_content_length = positive("MAX_CONTENT_LENGTH", v)?;
        }
        if let Some(v) = parse_var::<usize>(&lookup, "MIN_CONTENT_LENGTH")? {
            settings.min_content_length = v;
        }
        if let Some(v) = parse_var::<u64>(&lookup, "CACHE_MAX_TTL_HOURS")? {
            settings.cache_max_ttl = hours(positive("CACHE_MAX_TTL_HOURS", v)?);
        }
        if let Some(v) = parse_var::<u64>(&lookup, "CACHE_TTL_HOURS")? {
            settings.cache_ttl = hours(positive("CACHE_TTL_HOURS", v)?);
        }
        if let Some(v) = parse_var::<u64>(&lookup, "FREE_TIER_DAILY_LIMIT")? {
            settings.free_tier_daily_limit = v;
        }
        if let Some(v) = parse_var::<u64>(&lookup, "FREE_TIER_MONTHLY_LIMIT")? {
            settings.free_tier_monthly_limit = v;
        }
        if let Some(raw) = lookup("ALLOWED_DOMAINS") {
            let domains: Vec<String> = raw
                .split(',')
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty())
                .collect();
            if !domains.is_empty() {
                settings.allowed_domains = domains;
            }
        }
        settings.redis_url = lookup("REDIS_URL").filter(|url| !url.trim().is_empty());
        if let Some(v) = parse_var::<u32>(&lookup, "REDIS_POOL_SIZE")? {
            settings.redis_pool_size = positive("REDIS_POOL_SIZE", v)?;
        }
        if let Some(v) = parse_var::<u64>(&lookup, "FETCH_CONNECT_TIMEOUT_SECS")? {
            settings.fetch_connect_timeout =
                Duration::from_secs(positive("FETCH_CONNECT_TIMEOUT_SECS", v)?);
        }
        if let Some(v) = parse_var::<u64>(&lookup, "FETCH_READ_TIMEOUT_SECS")? {
            settings.fetch_read_timeout =
                Duration::from_secs(positive("FETCH_READ_TIMEOUT_SECS", v)?);
        }
        if let Some(v) = parse_var::<u32>(&lookup, "FETCH_MAX_ATTEMPTS")? {
            settings.fetch_max_attempts = positive("FETCH_MAX_ATTEMPTS", v)?;
        }
        if let Some(v) = parse_var::<u64>(&lookup, "AI_TIMEOUT_SECS")? {
            settings.ai_timeout = Duration::from_secs(positive("AI_TIMEOUT_SECS", v)?);
        }

        settings.min_content_length = settings.min_content_length.min(settings.max_content_length);
        Ok(settings)
    }

    /// Cache lifetime after clamping to the configured maximum
    pub fn effective_cache_ttl(&self) -> Duration {
        self.cache_ttl.min(self.cache_max_ttl)
    }

    pub fn rate_limit_requests(mut self, requests: u64, window: Duration) -> Self {
        self.rate_limit_requests = requests;
        self.rate_limit_window = window;
        self
    }

    pub fn free_tier(mut self, daily: u64, monthly: u64) -> Self {
        self.free_tier_daily_limit = daily;
        self.free_tier_monthly_limit = monthly;
        self
    }

    pub fn enforce_rate_limit(mut self, enforce: bool) -> Self {
        self.enforce_rate_limit = enforce;
        self
    }

    pub fn allowed_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_domains = domains.into_iter().map(Into::into).collect();
        self
    }

    /// Store connection settings
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            redis_url: self.redis_url.clone(),
            ..StoreConfig::default()
        }
        .pool_size(self.redis_pool_size)
    }

    /// Fetcher settings
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig::default()
            .allowed_domains(self.allowed_domains.iter().cloned())
            .content_length(self.min_content_length, self.max_content_length)
            .retry(RetryConfig {
                max_attempts: self.fetch_max_attempts,
                connect_timeout: self.fetch_connect_timeout,
                read_timeout: self.fetch_read_timeout,
                ..RetryConfig::default()
            })
    }
}

fn hours(n: u64) -> Duration {
    Duration::from_secs(n.saturating_mul(HOUR))
}
