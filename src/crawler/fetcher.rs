//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the shared HTTP client with the configured user agent
//! - Redirect and timeout limits
//! - Content-size enforcement, both from `Content-Length` and while streaming
//! - Error classification into `FetchError`

use crate::config::CrawlerConfig;
use crate::FetchError;
use reqwest::{header::CONTENT_TYPE, redirect::Policy, Client, Response};
use std::time::Duration;
use tracing::debug;

/// A successful HTTP response, fully read into memory
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// Final URL after redirects
    pub final_url: String,

    /// HTTP status code (always 2xx)
    pub status_code: u16,

    /// Content-Type header value, lowercased; empty if absent
    pub content_type: String,

    /// Response body
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Builds an HTTP client with proper configuration
///
/// The same client is used for robots.txt and page fetches so both carry
/// the configured user agent and timeout.
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use crawl_digest::config::CrawlerConfig;
/// use crawl_digest::crawler::build_http_client;
///
/// let client = build_http_client(&CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(config.timeout_duration())
        .connect_timeout(Duration::from_secs(10).min(config.timeout_duration()))
        .redirect(Policy::limited(config.max_redirects))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL, enforcing the size limit
///
/// # Request Flow
///
/// 1. Send GET request (redirects followed by the client)
/// 2. Reject non-2xx statuses
/// 3. Reject bodies whose `Content-Length` exceeds `max_size` before reading
/// 4. Stream the body, aborting once it grows past `max_size`
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `url` - The URL to fetch
/// * `max_size` - Maximum accepted body size in bytes
pub async fn fetch(client: &Client, url: &str, max_size: u64) -> Result<RawResponse, FetchError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| FetchError::from_reqwest(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let final_url = response.url().to_string();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_lowercase();
    let body = read_body(response, url, max_size).await?;

    debug!("Fetched {} ({} bytes, {})", final_url, body.len(), content_type);

    Ok(RawResponse {
        final_url,
        status_code: status.as_u16(),
        content_type,
        body,
    })
}

/// Reads a response body, refusing anything larger than `max_size`
///
/// `Content-Length` is checked before any bytes are read; the streamed
/// length is checked as chunks arrive, since the header may be absent.
pub(crate) async fn read_body(
    mut response: Response,
    url: &str,
    max_size: u64,
) -> Result<Vec<u8>, FetchError> {
    if let Some(size) = response.content_length() {
        if size > max_size {
            return Err(FetchError::TooLarge {
                url: url.to_string(),
                size,
                limit: max_size,
            });
        }
    }

    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| FetchError::from_reqwest(url, e))?
    {
        body.extend_from_slice(&chunk);
        if body.len() as u64 > max_size {
            return Err(FetchError::TooLarge {
                url: url.to_string(),
                size: body.len() as u64,
                limit: max_size,
            });
        }
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> Client {
        build_http_client(&CrawlerConfig::default()).unwrap()
    }

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client(&CrawlerConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("<html></html>", "text/html"))
            .mount(&server)
            .await;

        let url = format!("{}/page", server.uri());
        let response = fetch(&client(), &url, 1024).await.unwrap();

        assert_eq!(response.status_code, 200);
        assert!(response.content_type.starts_with("text/html"));
        assert_eq!(response.text(), "<html></html>");
    }

    #[tokio::test]
    async fn test_fetch_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = format!("{}/missing", server.uri());
        let err = fetch(&client(), &url, 1024).await.unwrap_err();

        assert!(matches!(err, FetchError::Status { status: 404, .. }));
        assert_eq!(err.status_code(), Some(404));
    }

    #[tokio::test]
    async fn test_fetch_too_large() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(2048)))
            .mount(&server)
            .await;

        let url = format!("{}/big", server.uri());
        let err = fetch(&client(), &url, 1024).await.unwrap_err();

        assert!(matches!(err, FetchError::TooLarge { limit: 1024, .. }));
    }

    #[tokio::test]
    async fn test_fetch_follows_redirect() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(
                ResponseTemplate::new(301)
                    .insert_header("location", format!("{}/new", server.uri()).as_str()),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/new"))
            .respond_with(ResponseTemplate::new(200).set_body_string("moved"))
            .mount(&server)
            .await;

        let url = format!("{}/old", server.uri());
        let response = fetch(&client(), &url, 1024).await.unwrap();

        assert!(response.final_url.ends_with("/new"));
        assert_eq!(response.text(), "moved");
    }

    #[tokio::test]
    async fn test_fetch_connection_error() {
        // Nothing listens on port 9 of localhost in the test environment
        let err = fetch(&client(), "http://127.0.0.1:9/", 1024).await.unwrap_err();
        assert!(matches!(err, FetchError::Http { .. } | FetchError::Timeout { .. }));
        assert_eq!(err.status_code(), None);
    }
}
