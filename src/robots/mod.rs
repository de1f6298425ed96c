//! Robots.txt handling module
//!
//! This module fetches, parses, and caches robots.txt files and answers the
//! two politeness questions the traversal engine asks for every URL: may we
//! fetch it, and how long must we wait first.

mod cache;
mod checker;
mod parser;

pub use cache::CachedRobots;
pub use checker::PolitenessChecker;
pub use parser::{product_token, ParsedRobots};

use crate::crawler::read_body;
use crate::CrawlError;
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument};

/// Fetches the raw robots.txt text for a host
///
/// # Arguments
///
/// * `client` - The shared HTTP client (carries user agent and timeouts)
/// * `host` - The `scheme://host[:port]` key of the site
/// * `max_size` - Largest robots.txt body accepted, in bytes
///
/// # Returns
///
/// * `Ok(String)` - The robots.txt body; empty when the host answers 404
/// * `Err(CrawlError::RobotsFetch)` - Any other non-2xx status, an oversized
///   body, or a transport error
#[instrument(skip(client), fields(host = %host))]
pub async fn fetch_robots(client: &Client, host: &str, max_size: u64) -> Result<String, CrawlError> {
    let robots_url = format!("{}/robots.txt", host.trim_end_matches('/'));
    let robots_error = |message: String| CrawlError::RobotsFetch {
        host: host.to_string(),
        message,
    };

    let response = client
        .get(&robots_url)
        .send()
        .await
        .map_err(|e| robots_error(e.to_string()))?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        debug!("No robots.txt at {}, allowing all", robots_url);
        return Ok(String::new());
    }
    if !status.is_success() {
        return Err(robots_error(format!("HTTP {}", status.as_u16())));
    }

    let body = read_body(response, &robots_url, max_size)
        .await
        .map_err(|e| robots_error(e.to_string()))?;
    Ok(String::from_utf8_lossy(&body).into_owned())
}
