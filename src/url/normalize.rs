use crate::UrlError;
use url::Url;

/// Normalizes a URL for dedup tracking
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Require an http or https scheme and a host
/// 3. Lowercase the host and resolve dot segments (done by the parser)
/// 4. Remove the fragment (everything after #)
/// 5. Remove a trailing slash from the path, except for the root path
///
/// The query string is kept exactly as given.
///
/// # Examples
///
/// ```
/// use crawl_digest::url::normalize_url;
///
/// let a = normalize_url("https://x.com/a/").unwrap();
/// let b = normalize_url("https://x.com/a#frag").unwrap();
/// assert_eq!(a.as_str(), "https://x.com/a");
/// assert_eq!(a, b);
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => {}
        _ => return Err(UrlError::MissingDomain),
    }

    url.set_fragment(None);

    let path = url.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/');
        let trimmed = if trimmed.is_empty() { "/" } else { trimmed }.to_string();
        url.set_path(&trimmed);
    }

    Ok(url)
}
