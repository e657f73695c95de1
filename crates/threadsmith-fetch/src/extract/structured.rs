//! JSON-LD article data

use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::LazyLock;

use super::text::{compile, element_text, normalize_whitespace};

static JSON_LD: LazyLock<Vec<Selector>> =
    LazyLock::new(|| compile(&[r#"script[type="application/ld+json"]"#]));

const ARTICLE_TYPES: &[&str] = &["Article", "NewsArticle", "BlogPosting"];

/// Body fields in order of preference
const BODY_FIELDS: &[&str] = &["articleBody", "text", "description"];

/// Every article object embedded in the page's JSON-LD blocks
fn articles(doc: &Html) -> Vec<Value> {
    let mut found = Vec::new();
    for script in JSON_LD.iter().flat_map(|s| doc.select(s)) {
        let raw: String = script.text().collect();
        // Blocks that fail to parse are skipped
        if let Ok(value) = serde_json::from_str::<Value>(raw.trim()) {
            collect_articles(value, &mut found);
        }
    }
    found
}

fn collect_articles(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => items.into_iter().for_each(|v| collect_articles(v, out)),
        Value::Object(mut map) => {
            if let Some(graph) = map.remove("@graph") {
                collect_articles(graph, out);
            }
            let value = Value::Object(map);
            if is_article(&value) {
                out.push(value);
            }
        }
        _ => {}
    }
}

fn is_article(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(kind)) => ARTICLE_TYPES.contains(&kind.as_str()),
        Some(Value::Array(kinds)) => kinds
            .iter()
            .filter_map(Value::as_str)
            .any(|kind| ARTICLE_TYPES.contains(&kind)),
        _ => false,
    }
}

/// Bodies sometimes carry markup; strip it
fn clean(raw: &str) -> String {
    if raw.contains('<') {
        let fragment = Html::parse_fragment(raw);
        element_text(fragment.root_element())
    } else {
        normalize_whitespace(raw)
    }
}

fn body_of(article: &Value) -> Option<String> {
    BODY_FIELDS
        .iter()
        .filter_map(|field| article.get(*field).and_then(Value::as_str))
        .map(clean)
        .find(|body| !body.is_empty())
}

/// Longest article body found in JSON-LD
pub fn extract(doc: &Html) -> Option<String> {
    articles(doc)
        .iter()
        .filter_map(body_of)
        .max_by_key(|body| body.len())
}

/// `headline` of the first article object
pub fn headline(doc: &Html) -> Option<String> {
    articles(doc)
        .iter()
        .filter_map(|a| a.get("headline").and_then(Value::as_str))
        .map(normalize_whitespace)
        .find(|h| !h.is_empty())
}
