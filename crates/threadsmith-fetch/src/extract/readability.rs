//! Paragraph scoring in the spirit of readability

use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

use super::text::{char_len, compile, element_text, SKIPPED_TAGS};

static CANDIDATES: LazyLock<Vec<Selector>> = LazyLock::new(|| compile(&["p, pre, blockquote"]));
static LINKS: LazyLock<Vec<Selector>> = LazyLock::new(|| compile(&["a"]));

/// Blocks below this score are dropped
pub const SCORE_THRESHOLD: f64 = 2.0;

const MIN_BLOCK_CHARS: usize = 25;
const CONTENT_ANCESTOR_BONUS: f64 = 3.0;
const BOILERPLATE_PENALTY: f64 = 3.0;

const BOILERPLATE_HINTS: &[&str] = &[
    "comment", "sidebar", "footer", "related", "share", "promo", "newsletter", "advert",
];

/// A scored block of text
#[derive(Debug, Clone)]
pub struct ScoredBlock {
    pub text: String,
    pub score: f64,
}

fn link_density(el: ElementRef<'_>, total_chars: usize) -> f64 {
    if total_chars == 0 {
        return 0.0;
    }
    let link_chars: usize = LINKS
        .iter()
        .flat_map(|s| el.select(s))
        .map(|a| char_len(&element_text(a)))
        .sum();
    (link_chars as f64 / total_chars as f64).min(1.0)
}

fn ancestor_adjustment(el: ElementRef<'_>) -> Option<f64> {
    let mut adjustment = 0.0;
    for ancestor in el.ancestors().filter_map(ElementRef::wrap) {
        let name = ancestor.value().name();
        if SKIPPED_TAGS.contains(&name) {
            return None;
        }
        if matches!(name, "article" | "main") {
            adjustment += CONTENT_ANCESTOR_BONUS;
        }
        let hints = [ancestor.value().attr("class"), ancestor.value().id()];
        let boilerplate = hints.iter().flatten().any(|attr| {
            let attr = attr.to_ascii_lowercase();
            BOILERPLATE_HINTS.iter().any(|hint| attr.contains(hint))
        });
        if boilerplate {
            adjustment -= BOILERPLATE_PENALTY;
        }
    }
    Some(adjustment)
}

/// Score one block; `None` for blocks that are too short or inside page chrome
pub fn score_block(el: ElementRef<'_>) -> Option<ScoredBlock> {
    let text = element_text(el);
    let chars = char_len(&text);
    if chars < MIN_BLOCK_CHARS {
        return None;
    }

    let adjustment = ancestor_adjustment(el)?;
    let length_score = (chars as f64 / 100.0).min(3.0);
    let punctuation = text.chars().filter(|c| matches!(c, ',' | '.' | ';' | ':' | '!' | '?')).count();
    let punctuation_score = (punctuation as f64 * 100.0 / chars as f64).min(3.0);
    let score = (1.0 + length_score + punctuation_score) * (1.0 - link_density(el, chars)) + adjustment;

    Some(ScoredBlock { text, score })
}

/// Every block at or above the threshold, in document order
pub fn scored_blocks(doc: &Html) -> Vec<ScoredBlock> {
    CANDIDATES
        .iter()
        .flat_map(|s| doc.select(s))
        .filter_map(score_block)
        .filter(|block| block.score >= SCORE_THRESHOLD)
        .collect()
}

pub fn extract(doc: &Html) -> Option<String> {
    let blocks = scored_blocks(doc);
    if blocks.is_empty() {
        return None;
    }
    Some(
        blocks
            .into_iter()
            .map(|b| b.text)
            .collect::<Vec<_>>()
            .join("\n\n"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARAGRAPH: &str = "This is a real paragraph of prose, with commas, full stops. And more text.";

    #[test]
    fn test_prose_kept_and_links_dropped() {
        let html = format!(
            "<div><p>{PARAGRAPH}</p>\
             <p><a href=\"/a\">Link one that is quite long</a> <a href=\"/b\">another long link</a></p></div>"
        );
        let doc = Html::parse_document(&html);
        assert_eq!(extract(&doc).as_deref(), Some(PARAGRAPH));
    }

    #[test]
    fn test_article_bonus() {
        let doc = Html::parse_document(&format!(
            "<div><p>{PARAGRAPH}</p></div><article><p>{PARAGRAPH}</p></article>"
        ));
        let blocks = scored_blocks(&doc);
        assert_eq!(blocks.len(), 2);
        assert!(blocks[1].score > blocks[0].score);
    }

    #[test]
    fn test_chrome_and_boilerplate_ignored() {
        let doc = Html::parse_document(&format!(
            "<footer><p>{PARAGRAPH}</p></footer><div class=\"comments\"><p>{PARAGRAPH}</p></div>"
        ));
        assert!(extract(&doc).is_none());
    }

    #[test]
    fn test_short_blocks_skipped() {
        let doc = Html::parse_document("<p>Too short.</p>");
        assert!(extract(&doc).is_none());
    }
}
