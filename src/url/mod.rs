//! URL handling module for Crawl-Digest
//!
//! This module provides URL normalization, crawlability checks,
//! and same-domain comparison.

mod domain;
mod normalize;

use crate::UrlError;
use url::Url;

// Re-export main functions
pub use domain::{host_key, is_same_domain, registrable_domain};
pub use normalize::normalize_url;

/// Path extensions that never lead to crawlable content
pub const SKIP_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".svg", ".ico", ".css", ".js", ".woff", ".woff2", ".ttf",
    ".mp3", ".mp4", ".avi", ".mov", ".zip", ".tar", ".gz",
];

/// Returns true if the path ends in a static-asset extension
pub fn has_skipped_extension(path: &str) -> bool {
    let path = path.to_lowercase();
    SKIP_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Validates that a URL is crawlable and returns its normalized form
///
/// A crawlable URL parses, uses http or https, has a host, and does not
/// point at a static asset.
///
/// # Examples
///
/// ```
/// use crawl_digest::url::validate_url;
///
/// assert!(validate_url("https://example.com/docs/").is_ok());
/// assert!(validate_url("https://example.com/logo.PNG").is_err());
/// assert!(validate_url("mailto:someone@example.com").is_err());
/// ```
pub fn validate_url(url_str: &str) -> Result<Url, UrlError> {
    let url = normalize_url(url_str)?;
    if has_skipped_extension(url.path()) {
        return Err(UrlError::SkippedExtension(url.to_string()));
    }
    Ok(url)
}
