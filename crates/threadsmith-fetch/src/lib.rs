//! threadsmith-fetch: article acquisition for threadsmith
//!
//! [`ArticleFetcher`] turns an allow-listed URL into [`ExtractedArticle`] text:
//!
//! 1. [`UrlGuard`] checks scheme, credentials and the domain allow-list, then
//!    resolves the host and rejects private, loopback and link-local targets.
//! 2. An [`AttemptPlan`] bounds retries: timeouts back off exponentially and a
//!    certificate failure on the first attempt earns one unverified retry.
//! 3. The [`Extractor`] waterfall tries JSON-LD, container selectors,
//!    readability scoring and OpenGraph, in that order.

pub mod error;
pub mod extract;
pub mod fetcher;
pub mod guard;
pub mod retry;

pub use error::{status_category, FetchError, Result};
pub use extract::{ExtractedArticle, ExtractionMethod, Extractor};
pub use fetcher::{ArticleFetcher, ContentSource, FetchConfig};
pub use guard::{is_public_ip, DomainPolicy, DomainRule, UrlGuard, DEFAULT_ALLOWED_DOMAINS};
pub use retry::{Attempt, AttemptPlan, RetryConfig};
