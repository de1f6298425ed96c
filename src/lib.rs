//! Crawl-Digest: a polite breadth-first crawler and chunking engine
//!
//! This crate crawls the web from seed URLs, deduplicates and rate-limits
//! according to robots.txt, converts fetched pages into markdown-like text,
//! and splits that text into typed, hierarchical chunks for a knowledge store.

pub mod capabilities;
pub mod chunking;
pub mod config;
pub mod crawler;
pub mod jobs;
pub mod output;
pub mod robots;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Crawl-Digest operations
///
/// A URL that another worker already claimed is not an error; it is
/// reported through [`crawler::CrawlOutcome::Skipped`].
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] UrlError),

    #[error("URL disallowed by robots.txt: {url}")]
    RobotsDisallowed { url: String },

    #[error("Failed to fetch robots.txt for {host}: {message}")]
    RobotsFetch { host: String, message: String },

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Parse error for {url}: {message}")]
    Parse { url: String, message: String },

    #[error("State store unavailable: {0}")]
    StoreUnavailable(#[from] storage::StorageError),

    #[error("Capability error: {0}")]
    Capability(#[from] capabilities::CapabilityError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Crawl cancelled")]
    Cancelled,
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid value for {var}: {value}")]
    InvalidEnv { var: String, value: String },
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Skipped static asset: {0}")]
    SkippedExtension(String),
}

/// HTTP fetch errors
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Content too large for {url}: {size} bytes (limit {limit})")]
    TooLarge { url: String, size: u64, limit: u64 },
}

impl FetchError {
    /// HTTP status associated with the failure, if the server answered
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Http {
                url: url.to_string(),
                source,
            }
        }
    }
}

/// Result type alias for Crawl-Digest operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use chunking::{Chunk, ChunkForest, ChunkType, ChunkingEngine, ChunkingStrategy};
pub use config::Config;
pub use crawler::{CrawlOutcome, CrawlResult, CrawlSession, Crawler};
pub use state::{FailureReason, TraversalState};
pub use storage::{FrontierStore, MemoryStore, SqliteStore};
pub use url::{is_same_domain, normalize_url, validate_url};
