//! Selector helpers shared by the source extractors.
//!
//! All helpers are tolerant: a missing node or attribute yields `None`,
//! never an error, so one bad field degrades a single record instead of
//! aborting a page.

use scraper::{ElementRef, Selector};
use url::Url;

/// Compile a fixed CSS selector. Selectors in this crate are string
/// literals, so a parse failure is a programmer error.
pub fn css(selector: &str) -> Selector {
    Selector::parse(selector).expect("valid css selector")
}

/// Trimmed text of the first match under `node`, or `None` when the
/// selector misses or matches only whitespace.
pub fn first_text(node: &ElementRef, selector: &Selector) -> Option<String> {
    node.select(selector).next().and_then(|el| element_text(&el))
}

/// Attribute value of the first match under `node`.
pub fn first_attr(node: &ElementRef, selector: &Selector, attr: &str) -> Option<String> {
    node.select(selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Concatenated, trimmed text content of a node.
pub fn element_text(node: &ElementRef) -> Option<String> {
    let text: String = node.text().collect::<Vec<_>>().join(" ");
    let text = normalize_whitespace(&text);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Collapse internal whitespace runs and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Resolve a link against a base URL. Absolute links pass through; relative
/// ones are joined, falling back to naive concatenation when the base does
/// not parse.
pub fn resolve_url(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    match Url::parse(base).and_then(|b| b.join(path)) {
        Ok(url) => url.to_string(),
        Err(_) => format!("{}{}", base, path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn test_first_text_trims_and_skips_empty() {
        let html = Html::parse_fragment("<div><h2>  Senior Engineer \n</h2><p>   </p></div>");
        let root = html.root_element();
        assert_eq!(
            first_text(&root, &css("h2")),
            Some("Senior Engineer".to_string())
        );
        assert_eq!(first_text(&root, &css("p")), None);
        assert_eq!(first_text(&root, &css("h3")), None);
    }

    #[test]
    fn test_first_attr() {
        let html = Html::parse_fragment(r#"<article><a href="/job/42">view</a></article>"#);
        let root = html.root_element();
        assert_eq!(
            first_attr(&root, &css("a"), "href"),
            Some("/job/42".to_string())
        );
        assert_eq!(first_attr(&root, &css("a"), "title"), None);
    }

    #[test]
    fn test_element_text_joins_nested_nodes() {
        let html = Html::parse_fragment("<li><span>AUD</span> <b>120k</b></li>");
        let root = html.root_element();
        assert_eq!(element_text(&root), Some("AUD 120k".to_string()));
    }

    #[test]
    fn test_resolve_url() {
        assert_eq!(
            resolve_url("https://www.seek.com.au", "/job/42"),
            "https://www.seek.com.au/job/42"
        );
        assert_eq!(
            resolve_url("https://www.seek.com.au", "https://other.example/x"),
            "https://other.example/x"
        );
        assert_eq!(resolve_url("not a base", "/path"), "not a base/path");
    }
}
