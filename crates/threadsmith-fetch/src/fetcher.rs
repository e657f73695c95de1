//! SSRF-safe article fetcher

use async_trait::async_trait;
use reqwest::{header, redirect::Policy, Client, Response};
use std::error::Error as StdError;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::{Host, Url};

use threadsmith_core::{NoopMetrics, ServiceMetrics};

use crate::error::{FetchError, Result};
use crate::extract::{ExtractedArticle, Extractor};
use crate::guard::{DomainPolicy, UrlGuard, DEFAULT_ALLOWED_DOMAINS};
use crate::retry::{Attempt, AttemptPlan, RetryConfig};

/// Anything that can turn a URL into article text
#[async_trait]
pub trait ContentSource: Send + Sync + 'static {
    async fn fetch(&self, url: &str) -> Result<ExtractedArticle>;
}

/// Fetcher configuration
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Allow-list entries: `example.com`, `*.example.com` or glob patterns
    pub allowed_domains: Vec<String>,
    /// Skip the resolved-address check; only for local test servers
    pub allow_private_networks: bool,
    pub retry: RetryConfig,
    pub min_content_length: usize,
    pub max_content_length: usize,
    /// Bytes read from a response body before the rest is discarded
    pub max_body_bytes: usize,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            allowed_domains: DEFAULT_ALLOWED_DOMAINS.iter().map(|d| d.to_string()).collect(),
            allow_private_networks: false,
            retry: RetryConfig::default(),
            min_content_length: 200,
            max_content_length: 50_000,
            max_body_bytes: 5 * 1024 * 1024,
            user_agent: concat!("threadsmith/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl FetchConfig {
    pub fn allowed_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_domains = domains.into_iter().map(Into::into).collect();
        self
    }

    pub fn allow_private_networks(mut self, allow: bool) -> Self {
        self.allow_private_networks = allow;
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn content_length(mut self, min: usize, max: usize) -> Self {
        self.min_content_length = min;
        self.max_content_length = max;
        self
    }
}

/// Raw response of one successful attempt
#[derive(Debug)]
struct Page {
    content_type: Option<String>,
    body: String,
}

/// Why a single attempt failed
#[derive(Debug)]
enum AttemptFailure {
    /// Certificate verification failed; eligible for the unverified retry
    Tls(String),
    Fetch(FetchError),
}

impl From<FetchError> for AttemptFailure {
    fn from(err: FetchError) -> Self {
        AttemptFailure::Fetch(err)
    }
}

/// Wording used by rustls and native TLS stacks for a rejected certificate
const CERTIFICATE_MARKERS: &[&str] = &[
    "certificate",
    "unknownissuer",
    "unknown issuer",
    "self signed",
    "self-signed",
    "verify failed",
    "verification failed",
];

/// Whether an error message reports certificate verification failing
///
/// Other handshake failures (protocol version, resets) are not included.
fn is_certificate_message(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    CERTIFICATE_MARKERS.iter().any(|marker| message.contains(marker))
}

/// Walk the source chain looking for a certificate problem
fn is_tls_failure(err: &reqwest::Error) -> bool {
    let mut source: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = source {
        if is_certificate_message(&e.to_string()) {
            return true;
        }
        source = e.source();
    }
    false
}

fn classify(err: reqwest::Error) -> AttemptFailure {
    if err.is_timeout() {
        if err.is_connect() {
            FetchError::ConnectTimeout.into()
        } else {
            FetchError::ReadTimeout.into()
        }
    } else if is_tls_failure(&err) {
        AttemptFailure::Tls(err.to_string())
    } else {
        FetchError::Transport(err.to_string()).into()
    }
}

/// Walk the attempt plan top-down
///
/// Timeouts move on to the next attempt. A certificate failure on the first
/// attempt runs `plan.tls_fallback` once and its outcome is final; on any
/// later attempt it is terminal. Every other failure is returned as is.
async fn walk_plan<'a, F, Fut>(url: &Url, plan: &'a AttemptPlan, mut run: F) -> Result<Page>
where
    F: FnMut(&'a Attempt) -> Fut,
    Fut: Future<Output = std::result::Result<Page, AttemptFailure>>,
{
    let last = plan.len();

    for (index, attempt) in plan.attempts.iter().enumerate() {
        match run(attempt).await {
            Ok(page) => return Ok(page),
            Err(AttemptFailure::Tls(reason)) if index == 0 => {
                warn!(
                    url = %url,
                    error = %reason,
                    "TLS verification failed, retrying once without verification"
                );
                return match run(&plan.tls_fallback).await {
                    Ok(page) => Ok(page),
                    Err(AttemptFailure::Tls(reason)) => Err(FetchError::Transport(reason)),
                    Err(AttemptFailure::Fetch(err)) => Err(err),
                };
            }
            Err(AttemptFailure::Tls(reason)) => return Err(FetchError::Transport(reason)),
            Err(AttemptFailure::Fetch(err)) if err.is_retryable() && index + 1 < last => {
                warn!(
                    url = %url,
                    attempt = attempt.number,
                    error = %err,
                    "Fetch attempt timed out, retrying"
                );
            }
            Err(AttemptFailure::Fetch(err)) => return Err(err),
        }
    }

    // The loop returns on its last iteration
    Err(FetchError::ReadTimeout)
}

/// Fetches articles from allow-listed sites
///
/// Each request is validated, resolved and pinned to the validated addresses
/// before any byte is sent. Redirects are never followed.
pub struct ArticleFetcher {
    guard: UrlGuard,
    extractor: Extractor,
    config: FetchConfig,
    metrics: Arc<dyn ServiceMetrics>,
}

impl ArticleFetcher {
    pub fn new(config: FetchConfig) -> Self {
        let guard = UrlGuard::new(DomainPolicy::new(&config.allowed_domains))
            .allow_private_networks(config.allow_private_networks);
        let extractor = Extractor::new(config.min_content_length, config.max_content_length);
        Self {
            guard,
            extractor,
            config,
            metrics: Arc::new(NoopMetrics),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn ServiceMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn client(&self, url: &Url, addrs: &[SocketAddr], attempt: &Attempt) -> Result<Client> {
        let mut builder = Client::builder()
            .user_agent(self.config.user_agent.as_str())
            .redirect(Policy::none())
            .no_proxy()
            .connect_timeout(attempt.connect_timeout)
            .read_timeout(attempt.read_timeout)
            .danger_accept_invalid_certs(!attempt.verify_tls);

        // Pin the validated addresses so the client does no DNS of its own
        if let Some(Host::Domain(domain)) = url.host() {
            builder = builder.resolve_to_addrs(domain, addrs);
        }

        builder
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))
    }

    async fn read_body(&self, mut response: Response) -> std::result::Result<String, AttemptFailure> {
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(classify)? {
            let room = self.config.max_body_bytes.saturating_sub(body.len());
            if chunk.len() >= room {
                body.extend_from_slice(&chunk[..room]);
                debug!(limit = self.config.max_body_bytes, "Response body truncated");
                break;
            }
            body.extend_from_slice(&chunk);
        }
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    async fn attempt(
        &self,
        url: &Url,
        addrs: &[SocketAddr],
        attempt: &Attempt,
    ) -> std::result::Result<Page, AttemptFailure> {
        let client = self.client(url, addrs, attempt)?;
        let response = client.get(url.clone()).send().await.map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::UpstreamStatus(status.as_u16()).into());
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_ascii_lowercase());
        let body = self.read_body(response).await?;

        Ok(Page { content_type, body })
    }

    /// One attempt bounded by its own connect and read timeouts
    async fn bounded_attempt(
        &self,
        url: &Url,
        addrs: &[SocketAddr],
        attempt: &Attempt,
    ) -> std::result::Result<Page, AttemptFailure> {
        if !attempt.delay.is_zero() {
            tokio::time::sleep(attempt.delay).await;
        }
        let budget = attempt.connect_timeout + attempt.read_timeout;
        let result = match tokio::time::timeout(budget, self.attempt(url, addrs, attempt)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::ReadTimeout.into()),
        };

        let host = url.host_str().unwrap_or_default();
        self.metrics.record_fetch_attempt(host, attempt.number, result.is_ok());
        result
    }

    async fn download(&self, url: &Url, addrs: &[SocketAddr]) -> Result<Page> {
        let plan = AttemptPlan::from_config(&self.config.retry);
        walk_plan(url, &plan, |attempt| self.bounded_attempt(url, addrs, attempt)).await
    }

    fn extract(&self, page: &Page) -> Result<ExtractedArticle> {
        let media_type = page
            .content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(str::trim);

        match media_type {
            None | Some("text/html") | Some("application/xhtml+xml") => {
                self.extractor.extract_html(&page.body)
            }
            Some("text/plain") => self.extractor.extract_plain(&page.body),
            Some(other) => Err(FetchError::ParseFailure(format!(
                "unsupported content type '{other}'"
            ))),
        }
    }
}

#[async_trait]
impl ContentSource for ArticleFetcher {
    async fn fetch(&self, raw_url: &str) -> Result<ExtractedArticle> {
        let url = self.guard.check(raw_url)?;
        let addrs = self.guard.resolve(&url).await?;
        debug!(url = %url, addrs = addrs.len(), "URL validated");

        let page = self.download(&url, &addrs).await?;
        let article = self.extract(&page)?;

        info!(
            url = %url,
            method = %article.method,
            length = article.content.len(),
            "Article extracted"
        );
        Ok(article)
    }
}
