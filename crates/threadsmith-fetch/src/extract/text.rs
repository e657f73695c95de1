//! Text helpers shared by the extraction strategies

use scraper::{ElementRef, Html, Selector};

/// Elements whose text never belongs to an article
pub(crate) const SKIPPED_TAGS: &[&str] = &[
    "head", "script", "style", "noscript", "template", "svg", "nav", "footer", "header", "aside",
    "form", "button", "iframe",
];

/// Block-level elements concatenated inside a container
pub(crate) const BLOCK_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "li", "blockquote", "pre",
];

/// Compile selectors, dropping any that fail to parse
pub(crate) fn compile(patterns: &[&str]) -> Vec<Selector> {
    patterns
        .iter()
        .filter_map(|p| Selector::parse(p).ok())
        .collect()
}

/// Collapse runs of whitespace into single spaces
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Cut `text` to at most `max` chars
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].trim_end().to_string(),
        None => text.to_string(),
    }
}

/// Normalized text of an element and everything under it
pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    let mut parts = Vec::new();
    collect_visible(el, &mut parts);
    normalize_whitespace(&parts.join(" "))
}

fn collect_visible<'a>(el: ElementRef<'a>, out: &mut Vec<&'a str>) {
    for child in el.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            if !SKIPPED_TAGS.contains(&child_el.value().name()) {
                collect_visible(child_el, out);
            }
        } else if let Some(text) = child.value().as_text() {
            out.push(&**text);
        }
    }
}

/// All visible text of a document, skipping scripts and page chrome
pub fn visible_text(doc: &Html) -> String {
    element_text(doc.root_element())
}

fn has_ancestor_in(el: ElementRef<'_>, stop: ElementRef<'_>, tags: &[&str]) -> bool {
    for ancestor in el.ancestors() {
        if ancestor.id() == stop.id() {
            return false;
        }
        if let Some(ancestor_el) = ElementRef::wrap(ancestor) {
            if tags.contains(&ancestor_el.value().name()) {
                return true;
            }
        }
    }
    false
}

/// Text of the outermost block elements under `container`, one entry per block
///
/// Falls back to the container's own text when it has no block children.
pub(crate) fn block_texts(container: ElementRef<'_>) -> Vec<String> {
    let blocks: Vec<String> = container
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| BLOCK_TAGS.contains(&el.value().name()))
        .filter(|el| !has_ancestor_in(*el, container, BLOCK_TAGS))
        .filter(|el| !has_ancestor_in(*el, container, SKIPPED_TAGS))
        .map(element_text)
        .filter(|text| !text.is_empty())
        .collect();

    if blocks.is_empty() {
        let text = element_text(container);
        if text.is_empty() { Vec::new() } else { vec![text] }
    } else {
        blocks
    }
}

/// Blocks of `container` joined as paragraphs
pub(crate) fn container_text(container: ElementRef<'_>) -> String {
    block_texts(container).join("\n\n")
}

/// First non-empty `content` attribute among matching meta tags
pub(crate) fn meta_content(doc: &Html, selectors: &[Selector]) -> Option<String> {
    selectors
        .iter()
        .flat_map(|s| doc.select(s))
        .filter_map(|m| m.value().attr("content"))
        .map(normalize_whitespace)
        .find(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_text_skips_chrome() {
        let doc = Html::parse_document(
            "<html><head><script>var x = 1;</script><style>p{}</style></head>\
             <body><nav>Home About</nav><p>Hello   world</p><footer>(c)</footer></body></html>",
        );
        assert_eq!(visible_text(&doc), "Hello world");
    }

    #[test]
    fn test_block_texts_uses_outermost_blocks() {
        let doc = Html::parse_document(
            "<article><h1>Title</h1><ul><li><p>nested</p></li></ul><p>Body</p>\
             <aside><p>related</p></aside></article>",
        );
        let article = compile(&["article"]);
        let el = doc.select(&article[0]).next().unwrap();
        assert_eq!(block_texts(el), vec!["Title", "nested", "Body"]);
    }

    #[test]
    fn test_truncate_on_char_boundary() {
        assert_eq!(truncate_chars("héllo wörld", 7), "héllo w");
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(char_len("héllo"), 5);
    }
}
