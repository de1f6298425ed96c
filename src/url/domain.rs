use std::net::IpAddr;
use url::Url;

/// Cache key for per-host state: `scheme://host[:port]`
///
/// # Examples
///
/// ```
/// use url::Url;
/// use crawl_digest::url::host_key;
///
/// let url = Url::parse("https://Example.com/path?q=1").unwrap();
/// assert_eq!(host_key(&url), "https://example.com");
/// ```
pub fn host_key(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default().to_lowercase();
    match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    }
}

/// Returns the registrable part of a host
///
/// DNS names keep their last two labels (`docs.example.com` → `example.com`).
/// IP addresses and single-label hosts such as `localhost` are returned whole.
pub fn registrable_domain(host: &str) -> String {
    let host = host.trim_end_matches('.').to_lowercase();
    let bare = host.trim_start_matches('[').trim_end_matches(']');
    if bare.parse::<IpAddr>().is_ok() {
        return host;
    }

    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    if labels.len() <= 2 {
        return labels.join(".");
    }
    labels[labels.len() - 2..].join(".")
}

/// Checks whether two URLs share a registrable domain
pub fn is_same_domain(a: &Url, b: &Url) -> bool {
    match (a.host_str(), b.host_str()) {
        (Some(ha), Some(hb)) => registrable_domain(ha) == registrable_domain(hb),
        _ => false,
    }
}
