//! threadsmith: turn articles into tweet threads
//!
//! # Features
//!
//! - **SSRF-safe article fetching** with retries and an extraction waterfall
//! - **Deterministic segmentation** into numbered tweets
//! - **Free-tier quotas** and fixed-window rate limits over Redis, degrading
//!   to an in-process store
//! - **Response cache** keyed by request fingerprint
//! - **Premium grants** keyed by IP and email
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use threadsmith::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::from_env()?;
//!     let store = connect(&settings.store_config()).await;
//!     let pipeline = GenerationPipeline::builder(settings, store).build();
//!
//!     let request = GenerateRequest::text("Rust makes systems programming approachable.");
//!     let response = pipeline.generate(&request, &RequestContext::new("203.0.113.7")).await?;
//!     for tweet in &response.tweets {
//!         println!("{}", tweet.content);
//!     }
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod generator;
pub mod pipeline;
pub mod premium;
pub mod quota;
pub mod segmenter;

// Re-export core
pub use threadsmith_core::*;

// Re-export storage
pub use threadsmith_storage::{connect, connect_with_metrics, LocalConfig, LocalStore, StoreConfig};
#[cfg(feature = "redis")]
pub use threadsmith_storage::{RemoteConfig, RemoteStore};

// Re-export fetching
pub use threadsmith_fetch::{
    ArticleFetcher, ContentSource, ExtractedArticle, ExtractionMethod, FetchConfig, FetchError,
};

pub use cache::{CacheConfig, ResponseCache};
pub use config::{ConfigError, Settings};
pub use error::{FailureResponse, GenerateError};
pub use fingerprint::Fingerprint;
pub use generator::{GeneratorError, TweetGenerator};
pub use pipeline::{
    GenerateRequest, GenerateResponse, GeneratedBy, GenerationPipeline, PipelineBuilder,
    RequestContext, SourceType,
};
pub use premium::{GrantMatch, PremiumGate, PremiumSource, PremiumStatus};
pub use quota::{QuotaLimits, QuotaStore, UsageCount, UsageSummary};
pub use segmenter::{Tweet, TweetSegmenter, MAX_TWEET_LENGTH};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        connect, GenerateError, GenerateRequest, GenerateResponse, GenerationPipeline,
        RequestContext, Settings, StoreBackend, Tweet, TweetGenerator, TweetSegmenter,
    };

    pub use crate::{LocalStore, ServiceMetrics, TracingMetrics};
}

#[cfg(test)]
mod tests;
