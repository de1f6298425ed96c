//! HTML parser for extracting links and the page title
//!
//! Links come from `<a href>` plus `<link rel="canonical|alternate|next|prev">`.
//! Every candidate is resolved against the page URL and must pass
//! [`validate_url`], so the result only holds crawlable, normalized URLs.

use crate::url::{is_same_domain, validate_url};
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// `rel` values on `<link>` elements that point at crawlable pages
const FOLLOWED_LINK_RELS: &[&str] = &["canonical", "alternate", "next", "prev"];

/// Extracted information from an HTML page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPage {
    /// `<title>`, else the first `<h1>`, else `"Untitled"`
    pub title: String,

    /// Crawlable links in document order, without duplicates
    pub links: Vec<String>,
}

/// Parses HTML content and extracts links and the title
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` anywhere in the document
/// - `<link rel="canonical|alternate|next|prev" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:`, `data:` and fragment-only links
/// - Non-http(s) URLs and static assets (images, scripts, fonts, archives, media)
/// - Links to another registrable domain, when `same_domain_only` is set
///
/// # Example
///
/// ```
/// use crawl_digest::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url, true);
/// assert_eq!(parsed.title, "Test");
/// assert_eq!(parsed.links, vec!["https://example.com/page".to_string()]);
/// ```
pub fn parse_html(html: &str, base_url: &Url, same_domain_only: bool) -> ParsedPage {
    let document = Html::parse_document(html);

    let links = extract_links(&document, base_url)
        .into_iter()
        .filter(|link| !same_domain_only || is_same_domain(base_url, link))
        .map(|link| link.to_string())
        .collect();

    ParsedPage {
        title: extract_title(&document),
        links,
    }
}

/// Extracts the page title from the HTML document
pub(crate) fn extract_title(document: &Html) -> String {
    ["title", "h1"]
        .iter()
        .filter_map(|tag| Selector::parse(tag).ok())
        .find_map(|selector| {
            document
                .select(&selector)
                .next()
                .map(|element| element.text().collect::<String>().trim().to_string())
                .filter(|s| !s.is_empty())
        })
        .unwrap_or_else(|| "Untitled".to_string())
}

/// Extracts all crawlable links from the HTML document
fn extract_links(document: &Html, base_url: &Url) -> Vec<Url> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();
    let mut push = |href: &str| {
        if let Some(url) = resolve_link(href, base_url) {
            if seen.insert(url.to_string()) {
                links.push(url);
            }
        }
    };

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
        }
    }

    if let Ok(link_selector) = Selector::parse("link[rel][href]") {
        for element in document.select(&link_selector) {
            let rel = element.value().attr("rel").unwrap_or_default().to_lowercase();
            if !rel.split_whitespace().any(|r| FOLLOWED_LINK_RELS.contains(&r)) {
                continue;
            }
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
        }
    }

    links
}

/// Resolves a link href to an absolute, normalized, crawlable URL
///
/// Returns None if the link should be excluded.
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    validate_url(absolute.as_str()).ok()
}
