//! Page metadata extraction.
//!
//! Parses title, meta description, canonical URL, OpenGraph fields, and
//! favicon out of already-fetched HTML.

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

/// Metadata scraped from a page's head.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub canonical_url: Option<String>,
    pub og_title: Option<String>,
    pub og_description: Option<String>,
    pub og_image: Option<String>,
    pub favicon: Option<String>,
}

fn select_first_text(doc: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    doc.select(&sel).next().map(|el| {
        el.text().collect::<String>().trim().to_string()
    })
}

fn select_first_attr(doc: &Html, selector: &str, attr: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    doc.select(&sel)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Resolve a possibly-relative reference against the page URL.
fn resolve(base_url: &str, reference: &str) -> Option<String> {
    match Url::parse(reference) {
        Ok(u) => Some(u.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(base_url)
            .ok()
            .and_then(|b| b.join(reference).ok())
            .map(|u| u.to_string()),
        Err(_) => None,
    }
}

/// Extract metadata from page HTML. Pure; fetch the HTML separately.
pub fn extract_metadata(html: &str, page_url: &str) -> PageMetadata {
    let doc = Html::parse_document(html);

    let title = select_first_text(&doc, "title").filter(|t| !t.is_empty());
    let description = select_first_attr(&doc, r#"meta[name="description"]"#, "content");
    let canonical_url = select_first_attr(&doc, r#"link[rel="canonical"]"#, "href")
        .and_then(|href| resolve(page_url, &href));
    let og_title = select_first_attr(&doc, r#"meta[property="og:title"]"#, "content");
    let og_description = select_first_attr(&doc, r#"meta[property="og:description"]"#, "content");
    let og_image = select_first_attr(&doc, r#"meta[property="og:image"]"#, "content")
        .and_then(|href| resolve(page_url, &href));
    let favicon = select_first_attr(&doc, r#"link[rel="icon"]"#, "href")
        .or_else(|| select_first_attr(&doc, r#"link[rel="shortcut icon"]"#, "href"))
        .and_then(|href| resolve(page_url, &href));

    PageMetadata {
        title,
        description,
        canonical_url,
        og_title,
        og_description,
        og_image,
        favicon,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "https://example.com/products/widget";

    #[test]
    fn test_extracts_title_and_description() {
        let html = r#"
            <html><head>
                <title> Widget Shop </title>
                <meta name="description" content="Buy widgets online.">
            </head><body></body></html>
        "#;
        let meta = extract_metadata(html, PAGE);
        assert_eq!(meta.title.as_deref(), Some("Widget Shop"));
        assert_eq!(meta.description.as_deref(), Some("Buy widgets online."));
    }

    #[test]
    fn test_extracts_opengraph_fields() {
        let html = r#"
            <head>
                <meta property="og:title" content="Widget">
                <meta property="og:description" content="The best widget.">
                <meta property="og:image" content="/img/widget.png">
            </head>
        "#;
        let meta = extract_metadata(html, PAGE);
        assert_eq!(meta.og_title.as_deref(), Some("Widget"));
        assert_eq!(meta.og_description.as_deref(), Some("The best widget."));
        assert_eq!(
            meta.og_image.as_deref(),
            Some("https://example.com/img/widget.png")
        );
    }

    #[test]
    fn test_resolves_relative_favicon_and_canonical() {
        let html = r#"
            <head>
                <link rel="canonical" href="/products/widget">
                <link rel="icon" href="favicon.ico">
            </head>
        "#;
        let meta = extract_metadata(html, PAGE);
        assert_eq!(
            meta.canonical_url.as_deref(),
            Some("https://example.com/products/widget")
        );
        assert_eq!(
            meta.favicon.as_deref(),
            Some("https://example.com/products/favicon.ico")
        );
    }

    #[test]
    fn test_empty_page_yields_all_none() {
        let meta = extract_metadata("<html></html>", PAGE);
        assert!(meta.title.is_none());
        assert!(meta.description.is_none());
        assert!(meta.canonical_url.is_none());
        assert!(meta.og_title.is_none());
    }
}
