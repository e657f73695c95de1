//! Common article containers

use scraper::{Html, Selector};
use std::sync::LazyLock;

use super::text::{char_len, compile, container_text};

/// Tried in order; the first container with enough text wins
const CONTAINERS: &[&str] = &[
    "article",
    "[itemprop=\"articleBody\"]",
    ".post-content",
    ".entry-content",
    ".article-body",
    ".article-content",
    ".post-body",
    ".story-body",
    ".markup",
    "main",
    "[role=\"main\"]",
    "#content",
    ".content",
];

static CONTAINER_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| compile(CONTAINERS));

/// Text of the first container reaching `min_length`, else the longest seen
pub fn extract(doc: &Html, min_length: usize) -> Option<String> {
    let mut longest: Option<String> = None;

    for selector in CONTAINER_SELECTORS.iter() {
        for container in doc.select(selector) {
            let text = container_text(container);
            if char_len(&text) >= min_length {
                return Some(text);
            }
            if longest.as_ref().is_none_or(|l| text.len() > l.len()) {
                longest = Some(text);
            }
        }
    }

    longest.filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_tag_first() {
        let doc = Html::parse_document(
            "<body><main><p>main text here</p></main>\
             <article><h2>Heading</h2><p>First paragraph.</p><p>Second paragraph.</p></article></body>",
        );
        assert_eq!(
            extract(&doc, 10).as_deref(),
            Some("Heading\n\nFirst paragraph.\n\nSecond paragraph.")
        );
    }

    #[test]
    fn test_class_containers() {
        let doc = Html::parse_document(
            "<div class=\"entry-content\"><p>Entry body text.</p></div>",
        );
        assert_eq!(extract(&doc, 5).as_deref(), Some("Entry body text."));
    }

    #[test]
    fn test_short_containers_return_longest() {
        let doc = Html::parse_document(
            "<article><p>tiny</p></article><main><p>a bit longer</p></main>",
        );
        assert_eq!(extract(&doc, 1000).as_deref(), Some("a bit longer"));
    }

    #[test]
    fn test_no_container() {
        let doc = Html::parse_document("<div><span>nothing</span></div>");
        assert!(extract(&doc, 1).is_none());
    }
}
