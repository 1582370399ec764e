//! Regex-based multi-strategy link extraction.
//!
//! Pulls links out of raw HTML without a full DOM pass: `href` attributes
//! first, then bare absolute URLs in text or scripts. Relative hrefs are
//! resolved against the page URL, order-preserving dedupe, non-http(s)
//! schemes dropped.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use url::Url;

fn href_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"href\s*=\s*["']([^"'#][^"']*)["']"#).expect("valid regex"))
}

fn absolute_url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"https?://[^\s"'<>()\\]+"#).expect("valid regex"))
}

/// Keep `candidate` if it is a not-yet-seen http(s) URL, fragment stripped.
fn push_link(candidate: Url, seen: &mut HashSet<String>, links: &mut Vec<String>) {
    if candidate.scheme() != "http" && candidate.scheme() != "https" {
        return;
    }
    let mut normalized = candidate;
    normalized.set_fragment(None);
    let s = normalized.to_string();
    if seen.insert(s.clone()) {
        links.push(s);
    }
}

/// Extract up to `max_links` outbound links from `html`, resolving
/// relative references against `base_url`.
pub fn extract_links(html: &str, base_url: &str, max_links: usize) -> Vec<String> {
    let base = Url::parse(base_url).ok();

    let mut seen: HashSet<String> = HashSet::new();
    let mut links: Vec<String> = Vec::new();

    // Strategy 1: href attributes, resolved against the base
    for cap in href_re().captures_iter(html) {
        if links.len() >= max_links {
            return links;
        }
        let raw = &cap[1];
        let resolved = match Url::parse(raw) {
            Ok(u) => Some(u),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                base.as_ref().and_then(|b| b.join(raw).ok())
            }
            Err(_) => None,
        };
        if let Some(u) = resolved {
            push_link(u, &mut seen, &mut links);
        }
    }

    // Strategy 2: bare absolute URLs anywhere in the document
    for m in absolute_url_re().find_iter(html) {
        if links.len() >= max_links {
            break;
        }
        let raw = m.as_str().trim_end_matches(['.', ',', ';', ')']);
        if let Ok(u) = Url::parse(raw) {
            push_link(u, &mut seen, &mut links);
        }
    }

    links.truncate(max_links);
    links
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://example.com/page";

    #[test]
    fn test_extracts_absolute_hrefs() {
        let html = r#"<a href="https://other.com/a">a</a> <a href="https://other.com/b">b</a>"#;
        let links = extract_links(html, BASE, 10);
        assert_eq!(links, vec!["https://other.com/a", "https://other.com/b"]);
    }

    #[test]
    fn test_resolves_relative_hrefs() {
        let html = r#"<a href="/about">about</a> <a href="contact.html">contact</a>"#;
        let links = extract_links(html, BASE, 10);
        assert_eq!(
            links,
            vec![
                "https://example.com/about",
                "https://example.com/contact.html"
            ]
        );
    }

    #[test]
    fn test_drops_non_http_schemes() {
        let html = r#"
            <a href="mailto:x@example.com">mail</a>
            <a href="javascript:void(0)">js</a>
            <a href="ftp://example.com/file">ftp</a>
            <a href="https://example.com/real">real</a>
        "#;
        let links = extract_links(html, BASE, 10);
        assert_eq!(links, vec!["https://example.com/real"]);
    }

    #[test]
    fn test_dedupes_preserving_first_seen_order() {
        let html = r#"
            <a href="https://a.com/">one</a>
            <a href="https://b.com/">two</a>
            <a href="https://a.com/">again</a>
        "#;
        let links = extract_links(html, BASE, 10);
        assert_eq!(links, vec!["https://a.com/", "https://b.com/"]);
    }

    #[test]
    fn test_caps_at_max_links() {
        let html: String = (0..20)
            .map(|i| format!(r#"<a href="https://example.com/p{i}">x</a>"#))
            .collect();
        let links = extract_links(&html, BASE, 5);
        assert_eq!(links.len(), 5);
    }

    #[test]
    fn test_cap_applies_across_both_strategies() {
        let html = r#"
            <a href="https://a.com/1">1</a>
            <a href="https://a.com/2">2</a>
            <a href="https://a.com/3">3</a>
            <p>Also see https://b.com/4 and https://b.com/5 and https://b.com/6</p>
        "#;
        let links = extract_links(html, BASE, 4);
        assert_eq!(
            links,
            vec![
                "https://a.com/1",
                "https://a.com/2",
                "https://a.com/3",
                "https://b.com/4"
            ]
        );
    }

    #[test]
    fn test_finds_bare_urls_outside_hrefs() {
        let html = r#"<p>Visit https://bare.example.com/path for more.</p>"#;
        let links = extract_links(html, BASE, 10);
        assert_eq!(links, vec!["https://bare.example.com/path"]);
    }

    #[test]
    fn test_fragment_only_hrefs_are_ignored() {
        let html = r##"<a href="#section">jump</a> <a href="https://a.com/">a</a>"##;
        let links = extract_links(html, BASE, 10);
        assert_eq!(links, vec!["https://a.com/"]);
    }
}
