//! Request orchestration: gates, quota, cache, acquisition and segmentation

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use threadsmith_core::{
    Clock, NoopMetrics, RateWindow, SegmentationSource, ServiceMetrics, Stage, StoreBackend,
    SystemClock,
};
use threadsmith_fetch::{ArticleFetcher, ContentSource};

use crate::cache::{CacheConfig, ResponseCache};
use crate::config::Settings;
use crate::error::{GenerateError, Result};
use crate::fingerprint::Fingerprint;
use crate::generator::{validate_output, GeneratorError, TweetGenerator};
use crate::premium::{PremiumGate, PremiumStatus};
use crate::quota::{QuotaLimits, QuotaStore, UsageSummary};
use crate::segmenter::{Tweet, TweetSegmenter};

/// Inbound request: exactly one of `url` or `text`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub url: Option<String>,
    pub text: Option<String>,
}

impl GenerateRequest {
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            text: None,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            url: None,
            text: Some(text.into()),
        }
    }

    fn source(&self, max_content_length: usize) -> Result<Source<'_>> {
        let url = self.url.as_deref().map(str::trim).filter(|u| !u.is_empty());
        let text = self.text.as_deref().filter(|t| !t.trim().is_empty());

        match (url, text) {
            (Some(url), None) => Ok(Source::Url(url)),
            (None, Some(text)) => {
                let length = text.chars().count();
                if length > max_content_length {
                    return Err(GenerateError::InvalidRequest(format!(
                        "text is {length} characters, maximum is {max_content_length}"
                    )));
                }
                Ok(Source::Text(text))
            }
            (Some(_), Some(_)) => Err(GenerateError::InvalidRequest(
                "provide either a url or text, not both".to_string(),
            )),
            (None, None) => Err(GenerateError::InvalidRequest(
                "a url or text is required".to_string(),
            )),
        }
    }
}

#[derive(Clone, Copy)]
enum Source<'a> {
    Url(&'a str),
    Text(&'a str),
}

impl Source<'_> {
    fn fingerprint(&self) -> Fingerprint {
        match self {
            Source::Url(url) => Fingerprint::for_url(url),
            Source::Text(text) => Fingerprint::for_text(text),
        }
    }

    fn kind(&self) -> SourceType {
        match self {
            Source::Url(_) => SourceType::Url,
            Source::Text(_) => SourceType::Text,
        }
    }
}

/// Caller identity supplied by the entry and auth layers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub ip: String,
    /// Authenticated email, if any
    pub email: Option<String>,
}

impl RequestContext {
    pub fn new(ip: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Url,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratedBy {
    Ai,
    Segmenter,
}

/// Successful generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub success: bool,
    pub tweets: Vec<Tweet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub source_type: SourceType,
    pub generated_by: GeneratedBy,
    /// Served from the response cache
    #[serde(default)]
    pub cached: bool,
}

/// Builder for [`GenerationPipeline`]
pub struct PipelineBuilder {
    settings: Settings,
    store: Arc<dyn StoreBackend>,
    fetcher: Option<Arc<dyn ContentSource>>,
    generator: Option<Arc<dyn TweetGenerator>>,
    clock: Arc<dyn Clock>,
    metrics: Arc<dyn ServiceMetrics>,
}

impl PipelineBuilder {
    /// Content source; defaults to an [`ArticleFetcher`] built from the settings
    pub fn fetcher(mut self, fetcher: Arc<dyn ContentSource>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn generator(mut self, generator: Arc<dyn TweetGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn metrics(mut self, metrics: Arc<dyn ServiceMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn build(self) -> GenerationPipeline {
        let settings = self.settings;
        let limits = QuotaLimits {
            daily: settings.free_tier_daily_limit,
            monthly: settings.free_tier_monthly_limit,
        };

        let quota = QuotaStore::new(self.store.clone(), limits)
            .with_clock(self.clock.clone())
            .with_metrics(self.metrics.clone());
        let cache = ResponseCache::new(
            self.store.clone(),
            CacheConfig {
                default_ttl: settings.effective_cache_ttl(),
                max_ttl: settings.cache_max_ttl,
            },
        )
        .with_clock(self.clock.clone())
        .with_metrics(self.metrics.clone());
        let premium = PremiumGate::new(self.store).with_clock(self.clock);

        let fetcher: Arc<dyn ContentSource> = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(
                ArticleFetcher::new(settings.fetch_config()).with_metrics(self.metrics.clone()),
            ),
        };

        GenerationPipeline {
            segmenter: TweetSegmenter::new(settings.max_tweet_length),
            settings,
            quota,
            cache,
            premium,
            fetcher,
            generator: self.generator,
            metrics: self.metrics,
        }
    }
}

/// Turns a URL or text into a thread
///
/// One instance serves every request; the only shared state lives in the
/// store handle it was built with.
pub struct GenerationPipeline {
    settings: Settings,
    quota: QuotaStore,
    cache: ResponseCache,
    premium: PremiumGate,
    fetcher: Arc<dyn ContentSource>,
    generator: Option<Arc<dyn TweetGenerator>>,
    segmenter: TweetSegmenter,
    metrics: Arc<dyn ServiceMetrics>,
}

impl GenerationPipeline {
    pub fn builder(settings: Settings, store: Arc<dyn StoreBackend>) -> PipelineBuilder {
        PipelineBuilder {
            settings,
            store,
            fetcher: None,
            generator: None,
            clock: Arc::new(SystemClock),
            metrics: Arc::new(NoopMetrics),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn quota(&self) -> &QuotaStore {
        &self.quota
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn premium(&self) -> &PremiumGate {
        &self.premium
    }

    /// Fixed-window decision for a client IP using the configured limit
    pub async fn check_rate_limit(&self, ip: &str) -> RateWindow {
        self.quota
            .check_rate_limit(ip, self.settings.rate_limit_requests, self.settings.rate_limit_window)
            .await
    }

    /// Current usage for the caller
    pub async fn usage(&self, ctx: &RequestContext) -> Result<UsageSummary> {
        Ok(self.quota.usage_summary(&ctx.ip, ctx.email()).await?)
    }

    pub async fn premium_status(&self, ctx: &RequestContext) -> Result<PremiumStatus> {
        Ok(self.premium.check(&ctx.ip, ctx.email()).await?)
    }

    pub async fn grant_premium(
        &self,
        ctx: &RequestContext,
        plan: &str,
        duration_days: u32,
    ) -> Result<PremiumStatus> {
        Ok(self.premium.grant(&ctx.ip, ctx.email(), plan, duration_days).await?)
    }

    /// Run one request through the pipeline
    ///
    /// Usage is reserved before the cache lookup and acquisition, so a cache
    /// hit or a failed generation still counts against the caller.
    pub async fn generate(&self, request: &GenerateRequest, ctx: &RequestContext) -> Result<GenerateResponse> {
        let started = Instant::now();
        let source = request.source(self.settings.max_content_length)?;
        let email = ctx.email();

        if self.settings.enforce_rate_limit {
            let stage = Instant::now();
            let decision = self.check_rate_limit(&ctx.ip).await;
            self.metrics.record_latency(Stage::RateLimit, stage.elapsed());
            if !decision.allowed {
                return Err(GenerateError::RateLimited { decision });
            }
        }

        let stage = Instant::now();
        let has_premium = match self.premium.check(&ctx.ip, email).await {
            Ok(status) => status.has_premium,
            Err(err) => {
                warn!(ip = %ctx.ip, error = %err, "Premium check failed, treating as free tier");
                false
            }
        };
        self.metrics.record_latency(Stage::Premium, stage.elapsed());

        if !has_premium {
            let stage = Instant::now();
            match self.quota.usage_summary(&ctx.ip, email).await {
                Ok(usage) => {
                    if let Some(period) = usage.blocked_by {
                        info!(ip = %ctx.ip, period = period.as_str(), "Free tier quota exceeded");
                        self.metrics.record_quota_exceeded(period);
                        return Err(GenerateError::QuotaExceeded { usage });
                    }
                }
                Err(err) => {
                    warn!(ip = %ctx.ip, error = %err, "Usage read failed, allowing request");
                }
            }
            self.metrics.record_latency(Stage::Quota, stage.elapsed());
        }

        let stage = Instant::now();
        self.quota.track_usage(&ctx.ip, email).await;
        self.metrics.record_latency(Stage::Reserve, stage.elapsed());

        let fingerprint = source.fingerprint();
        match self.cache.get::<GenerateResponse>(&fingerprint).await {
            Ok(Some(mut response)) => {
                response.cached = true;
                self.metrics.record_latency(Stage::Total, started.elapsed());
                return Ok(response);
            }
            Ok(None) => {}
            Err(err) => warn!(fingerprint = fingerprint.short(), error = %err, "Cache lookup failed"),
        }

        let (title, content) = match source {
            Source::Url(url) => {
                let stage = Instant::now();
                let article = self.fetcher.fetch(url).await?;
                self.metrics.record_latency(Stage::Acquire, stage.elapsed());
                (article.title, article.content)
            }
            Source::Text(text) => (None, text.to_string()),
        };

        let stage = Instant::now();
        let (tweets, generated_by) = self.segment(&content).await;
        self.metrics.record_latency(Stage::Segment, stage.elapsed());
        if tweets.is_empty() {
            return Err(GenerateError::ExtractionFailure(
                "No text to turn into a thread".to_string(),
            ));
        }

        let response = GenerateResponse {
            success: true,
            tweets,
            title,
            source_type: source.kind(),
            generated_by,
            cached: false,
        };

        if let Err(err) = self.cache.put(&fingerprint, &response, None).await {
            warn!(fingerprint = fingerprint.short(), error = %err, "Failed to cache response");
        }

        debug!(
            fingerprint = fingerprint.short(),
            tweets = response.tweets.len(),
            "Thread generated"
        );
        self.metrics.record_latency(Stage::Total, started.elapsed());
        Ok(response)
    }

    /// Generator first, segmenter on any failure
    async fn segment(&self, content: &str) -> (Vec<Tweet>, GeneratedBy) {
        if let Some(generator) = &self.generator {
            match self.ask_generator(generator.as_ref(), content).await {
                Ok(parts) => {
                    self.metrics.record_segmentation(SegmentationSource::Ai);
                    let total = parts.len();
                    let tweets = parts
                        .into_iter()
                        .enumerate()
                        .map(|(i, part)| Tweet::new(i + 1, total, part))
                        .collect();
                    return (tweets, GeneratedBy::Ai);
                }
                Err(err) => {
                    warn!(generator = generator.name(), error = %err, "Generator failed, using segmenter");
                    self.metrics.record_segmentation(SegmentationSource::Fallback);
                }
            }
        } else {
            self.metrics.record_segmentation(SegmentationSource::Segmenter);
        }

        (self.segmenter.split(content, true), GeneratedBy::Segmenter)
    }

    async fn ask_generator(
        &self,
        generator: &dyn TweetGenerator,
        content: &str,
    ) -> std::result::Result<Vec<String>, GeneratorError> {
        let max_length = self.settings.max_tweet_length;
        let parts = tokio::time::timeout(self.settings.ai_timeout, generator.generate(content, max_length))
            .await
            .map_err(|_| GeneratorError::Timeout)??;
        validate_output(parts, max_length)
    }
}
