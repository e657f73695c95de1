//! OpenGraph-guided extraction

use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

use super::text::{char_len, compile, container_text, element_text, meta_content};

static OG_TITLE: LazyLock<Vec<Selector>> = LazyLock::new(|| compile(&[r#"meta[property="og:title"]"#]));
static OG_DESCRIPTION: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    compile(&[
        r#"meta[property="og:description"]"#,
        r#"meta[name="description"]"#,
    ])
});
static HEADINGS: LazyLock<Vec<Selector>> = LazyLock::new(|| compile(&["h1, h2, h3"]));

pub fn og_title(doc: &Html) -> Option<String> {
    meta_content(doc, &OG_TITLE)
}

pub fn og_description(doc: &Html) -> Option<String> {
    meta_content(doc, &OG_DESCRIPTION)
}

/// Heading whose text matches the OpenGraph title
fn locate_heading<'a>(doc: &'a Html, title: &str) -> Option<ElementRef<'a>> {
    let title = title.to_lowercase();
    HEADINGS
        .iter()
        .flat_map(|s| doc.select(s))
        .find(|heading| {
            let text = element_text(*heading).to_lowercase();
            !text.is_empty() && (title.contains(&text) || text.contains(&title))
        })
}

/// Text of the smallest region around the title heading that reaches `min_length`
fn region_text(heading: ElementRef<'_>, min_length: usize) -> Option<String> {
    let mut best: Option<String> = None;

    for ancestor in heading.ancestors().filter_map(ElementRef::wrap) {
        if matches!(ancestor.value().name(), "body" | "html") {
            break;
        }
        let text = container_text(ancestor);
        let enough = char_len(&text) >= min_length;
        best = Some(text);
        if enough {
            break;
        }
    }

    best.filter(|text| !text.is_empty())
}

/// Region near the `og:title` heading, or `og:description` as a last resort
pub fn extract(doc: &Html, min_length: usize) -> Option<String> {
    let region = og_title(doc)
        .and_then(|title| locate_heading(doc, &title))
        .and_then(|heading| region_text(heading, min_length));

    match region {
        Some(text) if char_len(&text) >= min_length => Some(text),
        region => og_description(doc)
            .filter(|description| char_len(description) >= min_length)
            .or(region),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_around_title() {
        let doc = Html::parse_document(
            r#"<html><head><meta property="og:title" content="The Story"></head><body>
               <div><span>menu</span></div>
               <div class="x"><h1>The Story</h1><p>Line one of the story.</p><p>Line two.</p></div>
               </body></html>"#,
        );
        assert_eq!(
            extract(&doc, 20).as_deref(),
            Some("The Story\n\nLine one of the story.\n\nLine two.")
        );
    }

    #[test]
    fn test_description_as_last_resort() {
        let doc = Html::parse_document(
            r#"<html><head><meta property="og:description" content="A long enough summary of the article."></head>
               <body><p>x</p></body></html>"#,
        );
        assert_eq!(
            extract(&doc, 20).as_deref(),
            Some("A long enough summary of the article.")
        );
        assert!(extract(&doc, 500).is_none());
    }
}
