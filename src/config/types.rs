use serde::Deserialize;
use std::time::Duration;

use crate::chunking::ChunkingStrategy;

/// Longest politeness delay honored, from config or robots.txt (seconds)
pub const MAX_DELAY_SECS: f64 = 3600.0;

/// Main configuration structure for Crawl-Digest
///
/// Every section is optional; a missing section takes its defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub storage: StorageConfig,
    pub queues: QueueConfig,
    pub chunking: ChunkingConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// User agent sent with every request and matched against robots.txt
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Minimum politeness delay before each fetch (seconds)
    pub delay: f64,

    /// Maximum depth to crawl from the seed URL
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Request timeout (seconds)
    pub timeout: u64,

    /// Largest body accepted, checked against Content-Length (bytes)
    #[serde(rename = "max-content-size")]
    pub max_content_size: u64,

    /// Maximum redirect hops followed per request
    #[serde(rename = "max-redirects")]
    pub max_redirects: usize,

    /// Only follow links on the same registrable domain as their page
    #[serde(rename = "same-domain-only")]
    pub same_domain_only: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: "crawl-digest/0.1.0".to_string(),
            delay: 1.0,
            max_depth: 3,
            timeout: 30,
            max_content_size: 10 * 1024 * 1024,
            max_redirects: 10,
            same_domain_only: true,
        }
    }
}

impl CrawlerConfig {
    pub fn delay_duration(&self) -> Duration {
        if self.delay.is_finite() && self.delay > 0.0 {
            Duration::from_secs_f64(self.delay.min(MAX_DELAY_SECS))
        } else {
            Duration::ZERO
        }
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

/// Frontier/state store configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Retention of visited-URL records (seconds)
    #[serde(rename = "url-ttl")]
    pub url_ttl: u64,

    /// Retention of cached robots.txt bodies (seconds)
    #[serde(rename = "robots-ttl")]
    pub robots_ttl: u64,

    /// Retention of cached page content (seconds)
    #[serde(rename = "content-ttl")]
    pub content_ttl: u64,

    /// How long a store call waits on a locked database (milliseconds)
    #[serde(rename = "busy-timeout")]
    pub busy_timeout: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "crawl-digest.db".to_string(),
            url_ttl: 7 * 24 * 3600,
            robots_ttl: 24 * 3600,
            content_ttl: 3600,
            busy_timeout: 5000,
        }
    }
}

impl StorageConfig {
    pub fn url_ttl(&self) -> Duration {
        Duration::from_secs(self.url_ttl)
    }

    pub fn robots_ttl(&self) -> Duration {
        Duration::from_secs(self.robots_ttl)
    }

    pub fn content_ttl(&self) -> Duration {
        Duration::from_secs(self.content_ttl)
    }
}

/// Names of the shared work queues
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub default: String,
    pub high: String,
    pub low: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            default: "default".to_string(),
            high: "high".to_string(),
            low: "low".to_string(),
        }
    }
}

impl QueueConfig {
    /// All configured queue names, default first
    pub fn names(&self) -> [&str; 3] {
        [&self.default, &self.high, &self.low]
    }
}

/// Chunking engine configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    #[serde(rename = "max-chunk-size")]
    pub max_chunk_size: usize,

    #[serde(rename = "overlap-size")]
    pub overlap_size: usize,

    /// Text chunks longer than this are re-split by size under Hybrid
    #[serde(rename = "hybrid-split-threshold")]
    pub hybrid_split_threshold: usize,

    #[serde(rename = "default-strategy")]
    pub default_strategy: ChunkingStrategy,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 1000,
            overlap_size: 200,
            hybrid_split_threshold: 1500,
            default_strategy: ChunkingStrategy::Hybrid,
        }
    }
}
