//! Content-type dispatch for fetched responses
//!
//! | Content-Type | Content | Links | Title |
//! |--------------|---------|-------|-------|
//! | `*html*` | markdown | extracted (if below max depth) | `<title>` / `<h1>` / `Untitled` |
//! | `*json*` | compact JSON text | none | `JSON from <path>` |
//! | claimed by a processor | processor output | none | `Content from <path>` |
//! | anything else | lossy UTF-8 text | none | `Content from <path>` |

use crate::capabilities::ProcessorRegistry;
use crate::crawler::fetcher::RawResponse;
use crate::crawler::markdown::html_to_markdown;
use crate::crawler::parser::parse_html;
use crate::CrawlError;
use tracing::{debug, warn};
use url::Url;

/// Normalized body of one fetched page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedContent {
    pub content_type: String,
    pub content: String,
    pub links: Vec<String>,
    pub title: String,
}

/// Options controlling link extraction
#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions {
    /// Whether links should be collected at all (depth below the limit)
    pub follow_links: bool,
    pub same_domain_only: bool,
}

/// Converts a raw response to normalized text plus links and title
///
/// Malformed JSON is logged as a parse error and passed through as text.
/// A processor failure is logged and the body is passed through as text.
pub async fn normalize_response(
    response: &RawResponse,
    url: &Url,
    options: ExtractOptions,
    processors: &ProcessorRegistry,
) -> NormalizedContent {
    let content_type = response.content_type.as_str();
    let path = url.path();

    if content_type.contains("html") {
        let html = response.text();
        let content = html_to_markdown(&html, url.as_str());
        let parsed = parse_html(&html, url, options.same_domain_only);
        let links = if options.follow_links {
            parsed.links
        } else {
            Vec::new()
        };
        debug!("Extracted {} links from {}", links.len(), url);
        return NormalizedContent {
            content_type: "text/markdown".to_string(),
            content,
            links,
            title: parsed.title,
        };
    }

    if content_type.contains("json") {
        let content = match serde_json::from_slice::<serde_json::Value>(&response.body) {
            Ok(value) => value.to_string(),
            Err(e) => {
                let err = CrawlError::Parse {
                    url: url.to_string(),
                    message: e.to_string(),
                };
                warn!("{}; keeping raw text", err);
                response.text()
            }
        };
        return NormalizedContent {
            content_type: "application/json".to_string(),
            content,
            links: Vec::new(),
            title: format!("JSON from {}", path),
        };
    }

    if processors.can_process(content_type) {
        match processors.process(&response.body, content_type, url.as_str()).await {
            Ok(content) => {
                return NormalizedContent {
                    content_type: "text/markdown".to_string(),
                    content,
                    links: Vec::new(),
                    title: format!("Content from {}", path),
                };
            }
            Err(e) => warn!("Processor failed for {}: {}; keeping raw text", url, e),
        }
    }

    NormalizedContent {
        content_type: if content_type.is_empty() {
            "text/plain".to_string()
        } else {
            content_type.to_string()
        },
        content: response.text(),
        links: Vec::new(),
        title: format!("Content from {}", path),
    }
}
