//! Content-addressed cache keys for requests

use sha2::{Digest, Sha256};
use std::fmt;

use threadsmith_core::keys;

/// SHA-256 of a normalized request
///
/// URL and text requests hash under different domain prefixes, so a text
/// that happens to equal a URL never shares its cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    fn digest(domain: &str, value: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain.as_bytes());
        hasher.update(b"\n");
        hasher.update(value.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn for_url(url: &str) -> Self {
        Self::digest("url", url.trim())
    }

    pub fn for_text(text: &str) -> Self {
        Self::digest("text", text)
    }

    /// Hex digest
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `cache:{hash}`
    pub fn cache_key(&self) -> String {
        keys::cache(&self.0)
    }

    /// First 12 hex chars, for logs
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
