//! Crawler module for page fetching and traversal
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with size and redirect limits
//! - HTML parsing, link extraction and markdown conversion
//! - The per-URL traversal state machine ([`Crawler`])
//! - Recursive breadth-first sessions ([`CrawlSession`])

mod content;
mod fetcher;
mod markdown;
mod parser;
mod session;
mod traversal;

pub use content::{normalize_response, ExtractOptions, NormalizedContent};
pub use fetcher::{build_http_client, fetch, RawResponse};
pub(crate) use fetcher::read_body;
pub use markdown::{html_to_markdown, plain_text, strip_source_marker};
pub use parser::{parse_html, ParsedPage};
pub use session::CrawlSession;
pub use traversal::Crawler;

use crate::state::FailureReason;
use serde::{Deserialize, Serialize};

/// Result of a successful page crawl
///
/// Consumed by the chunking stage; the normalized content is also cached
/// in the shared store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlResult {
    pub url: String,
    pub depth: u32,
    pub content_type: String,
    pub content: String,
    pub links: Vec<String>,
    pub status_code: u16,
    pub title: String,
}

/// How one crawl attempt ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlOutcome {
    Success(CrawlResult),

    /// Expected terminations: already visited, too deep, or cancelled
    Skipped { url: String, reason: FailureReason },

    Failed {
        url: String,
        reason: FailureReason,
        message: String,
    },
}

impl CrawlOutcome {
    /// "success", "skipped" or "error"
    pub fn status(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Skipped { .. } => "skipped",
            Self::Failed { .. } => "error",
        }
    }

    /// Human-readable reason for a non-success outcome
    pub fn reason(&self) -> Option<String> {
        match self {
            Self::Success(_) => None,
            Self::Skipped { reason, .. } => Some(match reason {
                FailureReason::AlreadyVisited => "already visited".to_string(),
                FailureReason::DepthExceeded => "depth limit exceeded".to_string(),
                FailureReason::Cancelled => "crawl cancelled".to_string(),
                other => other.as_str().replace('_', " "),
            }),
            Self::Failed { message, .. } => Some(message.clone()),
        }
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            Self::Success(_) => None,
            Self::Skipped { reason, .. } | Self::Failed { reason, .. } => Some(*reason),
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Success(result) => &result.url,
            Self::Skipped { url, .. } | Self::Failed { url, .. } => url,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn as_result(&self) -> Option<&CrawlResult> {
        match self {
            Self::Success(result) => Some(result),
            _ => None,
        }
    }

    pub fn into_result(self) -> Option<CrawlResult> {
        match self {
            Self::Success(result) => Some(result),
            _ => None,
        }
    }
}
