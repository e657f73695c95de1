//! SSRF guard: scheme, domain allow-list and resolved-address checks
//!
//! Every URL goes through [`UrlGuard::check`] before any network I/O and
//! through [`UrlGuard::resolve`] before the request is sent. The addresses
//! returned by `resolve` are the only ones the HTTP client is allowed to
//! connect to, so a second DNS answer cannot point the request elsewhere.

use regex::Regex;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use url::{Host, Url};

use crate::error::{FetchError, Result};

/// Domains accepted when no allow-list is configured
pub const DEFAULT_ALLOWED_DOMAINS: &[&str] = &[
    "medium.com",
    "substack.com",
    "dev.to",
    "hashnode.dev",
    "hackernoon.com",
    "github.com",
    "github.io",
    "wikipedia.org",
    "nytimes.com",
    "theguardian.com",
    "bbc.co.uk",
    "bbc.com",
    "reuters.com",
    "bloomberg.com",
    "forbes.com",
    "techcrunch.com",
    "theverge.com",
    "wired.com",
    "arstechnica.com",
    "cnn.com",
    "washingtonpost.com",
    "economist.com",
    "*.blogspot.com",
    "*.wordpress.com",
];

/// One allow-list entry
#[derive(Debug, Clone)]
pub enum DomainRule {
    /// `example.com`: the domain itself or any subdomain
    Base(String),
    /// `*.example.com`: subdomains only
    Subdomains(String),
    /// Any other pattern with `*` or `?`; a wildcard never crosses a dot
    Glob(Regex),
}

impl DomainRule {
    /// Parse one allow-list entry; blank or unparseable patterns yield `None`
    pub fn parse(pattern: &str) -> Option<Self> {
        let pattern = pattern.trim().trim_end_matches('.').to_ascii_lowercase();
        if pattern.is_empty() {
            return None;
        }

        if let Some(base) = pattern.strip_prefix("*.") {
            if !base.is_empty() && !base.contains(['*', '?']) {
                return Some(DomainRule::Subdomains(base.to_string()));
            }
        }

        if pattern.contains(['*', '?']) {
            let escaped = regex::escape(&pattern)
                .replace(r"\*", "[^.]*")
                .replace(r"\?", "[^.]");
            return Regex::new(&format!("^{escaped}$")).ok().map(DomainRule::Glob);
        }

        Some(DomainRule::Base(pattern))
    }

    pub fn matches(&self, host: &str) -> bool {
        match self {
            DomainRule::Base(base) => {
                host == base
                    || host
                        .strip_suffix(base.as_str())
                        .is_some_and(|prefix| prefix.ends_with('.'))
            }
            DomainRule::Subdomains(base) => host
                .strip_suffix(base.as_str())
                .is_some_and(|prefix| prefix.len() > 1 && prefix.ends_with('.')),
            DomainRule::Glob(regex) => regex.is_match(host),
        }
    }
}

/// Ordered set of allow-list rules
#[derive(Debug, Clone)]
pub struct DomainPolicy {
    rules: Vec<DomainRule>,
}

impl DomainPolicy {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            rules: patterns
                .into_iter()
                .filter_map(|p| DomainRule::parse(p.as_ref()))
                .collect(),
        }
    }

    /// Whether `host` is covered by any rule; an empty policy allows nothing
    pub fn allows(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        self.rules.iter().any(|rule| rule.matches(&host))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for DomainPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWED_DOMAINS)
    }
}

/// Whether `ip` is a publicly routable address
pub fn is_public_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_public_v4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_public_v4(v4),
            None => is_public_v6(v6),
        },
    }
}

fn is_public_v4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    let shared = a == 100 && (b & 0xc0) == 64; // 100.64.0.0/10
    !(ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || ip.is_documentation()
        || ip.is_multicast()
        || a == 0
        || shared)
}

fn is_public_v6(ip: Ipv6Addr) -> bool {
    let segments = ip.segments();
    let unique_local = (segments[0] & 0xfe00) == 0xfc00;
    let link_local = (segments[0] & 0xffc0) == 0xfe80;
    let documentation = segments[0] == 0x2001 && segments[1] == 0x0db8;
    !(ip.is_loopback()
        || ip.is_unspecified()
        || ip.is_multicast()
        || unique_local
        || link_local
        || documentation)
}

/// Validates URLs and their resolved addresses
#[derive(Debug, Clone)]
pub struct UrlGuard {
    policy: DomainPolicy,
    allow_private_networks: bool,
}

impl UrlGuard {
    pub fn new(policy: DomainPolicy) -> Self {
        Self {
            policy,
            allow_private_networks: false,
        }
    }

    /// Skip the resolved-address check (local test servers only)
    pub fn allow_private_networks(mut self, allow: bool) -> Self {
        self.allow_private_networks = allow;
        self
    }

    /// Parse `raw` and run every check that needs no network I/O
    pub fn check(&self, raw: &str) -> Result<Url> {
        let url = Url::parse(raw.trim()).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(FetchError::SecurityRejection(format!(
                "unsupported scheme '{}'",
                url.scheme()
            )));
        }

        if !url.username().is_empty() || url.password().is_some() {
            return Err(FetchError::SecurityRejection(
                "credentials in url are not allowed".to_string(),
            ));
        }

        let host = host_label(&url)?;
        if !self.policy.allows(&host) {
            return Err(FetchError::SecurityRejection(format!(
                "domain '{host}' is not in the allow-list"
            )));
        }

        Ok(url)
    }

    /// Resolve the URL's host and reject non-public addresses
    ///
    /// Any non-public answer rejects the whole request.
    pub async fn resolve(&self, url: &Url) -> Result<Vec<SocketAddr>> {
        let port = url
            .port_or_known_default()
            .ok_or_else(|| FetchError::InvalidUrl("missing port".to_string()))?;

        let addrs: Vec<SocketAddr> = match url.host() {
            Some(Host::Ipv4(ip)) => vec![SocketAddr::new(IpAddr::V4(ip), port)],
            Some(Host::Ipv6(ip)) => vec![SocketAddr::new(IpAddr::V6(ip), port)],
            Some(Host::Domain(domain)) => tokio::net::lookup_host((domain, port))
                .await
                .map_err(|e| FetchError::Transport(format!("dns lookup failed: {e}")))?
                .collect(),
            None => return Err(FetchError::InvalidUrl("missing host".to_string())),
        };

        if addrs.is_empty() {
            return Err(FetchError::Transport("dns lookup returned no addresses".to_string()));
        }

        if !self.allow_private_networks {
            if let Some(addr) = addrs.iter().find(|a| !is_public_ip(a.ip())) {
                return Err(FetchError::SecurityRejection(format!(
                    "host resolves to non-public address {}",
                    addr.ip()
                )));
            }
        }

        Ok(addrs)
    }
}

impl Default for UrlGuard {
    fn default() -> Self {
        Self::new(DomainPolicy::default())
    }
}

fn host_label(url: &Url) -> Result<String> {
    match url.host() {
        Some(Host::Domain(domain)) => Ok(domain.to_ascii_lowercase()),
        Some(Host::Ipv4(ip)) => Ok(ip.to_string()),
        Some(Host::Ipv6(ip)) => Ok(ip.to_string()),
        None => Err(FetchError::InvalidUrl("missing host".to_string())),
    }
}
