//! Extraction waterfall: structured data, selectors, readability, OpenGraph
//!
//! Strategies run in order and the first whose text reaches the minimum
//! length wins. Nothing is cached between strategies.

pub mod opengraph;
pub mod paywall;
pub mod readability;
pub mod selectors;
pub mod structured;
pub mod text;

use scraper::{Html, Selector};
use std::fmt;
use std::sync::LazyLock;
use tracing::debug;

use crate::error::{FetchError, Result};
use text::{char_len, compile, normalize_whitespace, truncate_chars, visible_text};

static TITLE: LazyLock<Vec<Selector>> = LazyLock::new(|| compile(&["title"]));

/// Strategy that produced an article's content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractionMethod {
    StructuredData,
    Selectors,
    Readability,
    OpenGraph,
    PlainText,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::StructuredData => "structured_data",
            ExtractionMethod::Selectors => "selectors",
            ExtractionMethod::Readability => "readability",
            ExtractionMethod::OpenGraph => "opengraph",
            ExtractionMethod::PlainText => "plain_text",
        }
    }
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a successful extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedArticle {
    pub title: Option<String>,
    pub content: String,
    pub method: ExtractionMethod,
}

/// Length bounds applied to extracted text
#[derive(Debug, Clone, Copy)]
pub struct Extractor {
    pub min_length: usize,
    pub max_length: usize,
}

impl Default for Extractor {
    fn default() -> Self {
        Self {
            min_length: 200,
            max_length: 50_000,
        }
    }
}

impl Extractor {
    pub fn new(min_length: usize, max_length: usize) -> Self {
        Self {
            min_length,
            max_length: max_length.max(min_length),
        }
    }

    /// Run the waterfall over an HTML document
    pub fn extract_html(&self, html: &str) -> Result<ExtractedArticle> {
        let doc = Html::parse_document(html);
        let title = resolve_title(&doc);

        let strategies: [(ExtractionMethod, &dyn Fn() -> Option<String>); 4] = [
            (ExtractionMethod::StructuredData, &|| structured::extract(&doc)),
            (ExtractionMethod::Selectors, &|| selectors::extract(&doc, self.min_length)),
            (ExtractionMethod::Readability, &|| readability::extract(&doc)),
            (ExtractionMethod::OpenGraph, &|| opengraph::extract(&doc, self.min_length)),
        ];

        let mut longest = 0;
        for (method, strategy) in strategies {
            let Some(content) = strategy() else { continue };
            let length = char_len(&content);
            debug!(method = %method, length, "Extraction candidate");
            if length >= self.min_length {
                return self.accept(title, content, method);
            }
            longest = longest.max(length);
        }

        let page_text = visible_text(&doc);
        if paywall::looks_paywalled(&page_text) {
            return Err(FetchError::Forbidden);
        }

        if longest == 0 {
            Err(FetchError::ExtractionFailure(
                "no article text found on the page".to_string(),
            ))
        } else {
            Err(FetchError::ContentTooShort {
                length: longest,
                minimum: self.min_length,
            })
        }
    }

    /// Use a `text/plain` body as-is
    pub fn extract_plain(&self, body: &str) -> Result<ExtractedArticle> {
        let content = body.trim().to_string();
        let length = char_len(&content);
        if length < self.min_length {
            if paywall::looks_paywalled(&content) {
                return Err(FetchError::Forbidden);
            }
            return Err(FetchError::ContentTooShort {
                length,
                minimum: self.min_length,
            });
        }
        self.accept(None, content, ExtractionMethod::PlainText)
    }

    fn accept(
        &self,
        title: Option<String>,
        content: String,
        method: ExtractionMethod,
    ) -> Result<ExtractedArticle> {
        if paywall::looks_paywalled(&content) {
            return Err(FetchError::Forbidden);
        }
        let content = truncate_chars(&content, self.max_length);
        Ok(ExtractedArticle {
            title,
            content,
            method,
        })
    }
}

/// `og:title`, then JSON-LD `headline`, then `<title>`
pub fn resolve_title(doc: &Html) -> Option<String> {
    opengraph::og_title(doc)
        .or_else(|| structured::headline(doc))
        .or_else(|| {
            TITLE
                .iter()
                .flat_map(|s| doc.select(s))
                .map(|t| normalize_whitespace(&t.text().collect::<String>()))
                .find(|t| !t.is_empty())
        })
}
