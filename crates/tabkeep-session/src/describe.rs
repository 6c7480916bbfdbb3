//! Short page descriptions from a page's document

use scraper::{Html, Selector};
use tabkeep_tabs::NO_DESCRIPTION;

pub const MAX_DESCRIPTION_CHARS: usize = 120;
const MAX_TITLE_CHARS: usize = 80;
const MIN_META_CHARS: usize = 10;
const MIN_TEXT_CHARS: usize = 20;
const MIN_TITLE_CHARS: usize = 5;
const MIN_RESULT_CHARS: usize = 5;

/// Best short description of an HTML document, never empty.
///
/// Tries, in order: `meta[name=description]`, `og:description`, the first
/// substantial paragraph, the article text, then the document title.
pub fn describe_document(html: &str) -> String {
    let doc = Html::parse_document(html);

    match extract_description(&doc) {
        Some(text) if text.chars().count() > MIN_RESULT_CHARS => text,
        _ => NO_DESCRIPTION.to_string(),
    }
}

fn extract_description(doc: &Html) -> Option<String> {
    for selector in ["meta[name='description']", "meta[property='og:description']"] {
        if let Some(text) = first_meta_content(doc, selector) {
            if text.chars().count() > MIN_META_CHARS {
                return Some(truncate_chars(&text, MAX_DESCRIPTION_CHARS));
            }
        }
    }

    if let Ok(sel) = Selector::parse("p") {
        for el in doc.select(&sel) {
            let text = normalize_whitespace(&el.text().collect::<Vec<_>>().join(" "));
            if text.chars().count() > MIN_TEXT_CHARS {
                return Some(truncate_chars(&text, MAX_DESCRIPTION_CHARS));
            }
        }
    }

    if let Ok(sel) = Selector::parse("article") {
        if let Some(el) = doc.select(&sel).next() {
            let text = normalize_whitespace(&el.text().collect::<Vec<_>>().join(" "));
            if text.chars().count() > MIN_TEXT_CHARS {
                return Some(truncate_chars(&text, MAX_DESCRIPTION_CHARS));
            }
        }
    }

    if let Ok(sel) = Selector::parse("title") {
        if let Some(el) = doc.select(&sel).next() {
            let text = normalize_whitespace(&el.text().collect::<Vec<_>>().join(" "));
            if text.chars().count() > MIN_TITLE_CHARS {
                return Some(truncate_chars(&text, MAX_TITLE_CHARS));
            }
        }
    }

    None
}

// Only the first match counts, as with querySelector
fn first_meta_content(doc: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    let el = doc.select(&sel).next()?;
    let content = el.value().attr("content")?;
    Some(normalize_whitespace(content))
}

pub(crate) fn truncate_chars(input: &str, max: usize) -> String {
    match input.char_indices().nth(max) {
        Some((idx, _)) => input[..idx].trim_end().to_string(),
        None => input.to_string(),
    }
}

fn normalize_whitespace(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_space = false;
    for ch in input.chars() {
        if ch.is_whitespace() {
            if !last_space {
                out.push(' ');
                last_space = true;
            }
        } else {
            out.push(ch);
            last_space = false;
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_description_wins() {
        let html = r#"<html><head>
            <title>Example Domain Title</title>
            <meta name="description" content="  A page about   examples  ">
            <meta property="og:description" content="Open Graph text here">
            </head><body><p>This paragraph is long enough to count.</p></body></html>"#;
        assert_eq!(describe_document(html), "A page about examples");
    }

    #[test]
    fn test_short_meta_falls_through_to_og() {
        let html = r#"<html><head>
            <meta name="description" content="Too short">
            <meta property="og:description" content="Open Graph description text">
            </head><body></body></html>"#;
        assert_eq!(describe_document(html), "Open Graph description text");
    }

    #[test]
    fn test_first_substantial_paragraph() {
        let html = r#"<html><body>
            <p>Short one.</p>
            <p>This paragraph has more than twenty characters.</p>
            </body></html>"#;
        assert_eq!(
            describe_document(html),
            "This paragraph has more than twenty characters."
        );
    }

    #[test]
    fn test_article_text() {
        let html = r#"<html><body><article><h1>Heading</h1><span>Body text of the article itself</span></article></body></html>"#;
        assert_eq!(describe_document(html), "Heading Body text of the article itself");
    }

    #[test]
    fn test_title_is_cut_to_eighty_chars() {
        let title = "T".repeat(100);
        let html = format!("<html><head><title>{}</title></head><body></body></html>", title);
        assert_eq!(describe_document(&html).chars().count(), 80);
    }

    #[test]
    fn test_long_description_is_bounded() {
        let text = "word ".repeat(60);
        let html = format!(r#"<html><head><meta name="description" content="{}"></head></html>"#, text);
        assert!(describe_document(&html).chars().count() <= MAX_DESCRIPTION_CHARS);
    }

    #[test]
    fn test_placeholder_when_nothing_usable() {
        assert_eq!(describe_document("<html><head><title>Hi</title></head></html>"), NO_DESCRIPTION);
        assert_eq!(describe_document(""), NO_DESCRIPTION);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 4), "héll");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
