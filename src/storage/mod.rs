//! Storage module for the shared crawl state
//!
//! This module holds everything the crawl workers share:
//! - The visited-URL set (write-once frontier records with a retention TTL)
//! - The robots.txt cache, keyed by scheme and host
//! - The content cache
//! - Named work queues of `(url, depth)` items with set semantics
//!
//! Keys follow the `crawl:<kind>:<id>` layout in both backends.

mod memory;
mod schema;
mod sqlite;
mod traits;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{FrontierStore, StorageError, StorageResult};

use crate::config::StorageConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;

/// Opens the SQLite-backed store described by the configuration
///
/// # Arguments
///
/// * `config` - Store settings (path, retention windows, busy timeout)
/// * `default_queue` - Queue used by the unnamed queue operations
pub fn open_store(config: &StorageConfig, default_queue: &str) -> StorageResult<SqliteStore> {
    SqliteStore::open(Path::new(&config.database_path), config, default_queue)
}

/// Record of a URL that was claimed or crawled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontierRecord {
    pub url: String,
    pub depth: u32,
    /// HTTP status once known; `None` while the claim is in flight or when
    /// the attempt never reached the server
    pub status_code: Option<u16>,
    pub crawled_at: DateTime<Utc>,
}

/// Cached robots.txt text with its retention window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotsRecord {
    /// Raw robots.txt; empty means no restrictions
    pub text: String,
    pub fetched_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Cached, already-normalized page content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedContent {
    pub content: String,
    pub content_type: String,
    pub cached_at: DateTime<Utc>,
}

/// An item waiting in a shared queue
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueItem {
    pub url: String,
    pub depth: u32,
}

impl QueueItem {
    pub fn new(url: impl Into<String>, depth: u32) -> Self {
        Self {
            url: url.into(),
            depth,
        }
    }

    /// Serialized member form stored in the queue set
    pub fn to_member(&self) -> StorageResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_member(member: &str) -> StorageResult<Self> {
        Ok(serde_json::from_str(member)?)
    }
}

/// Counters describing the shared state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub crawled_urls: u64,
    pub cached_robots: u64,
    pub cached_content: u64,
    pub queue_sizes: BTreeMap<String, u64>,
}

/// First 16 hex characters of the SHA-256 of a URL
pub fn url_hash(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    hex::encode(digest)[..16].to_string()
}

pub fn url_key(url: &str) -> String {
    format!("crawl:url:{}", url_hash(url))
}

pub fn robots_key(host: &str) -> String {
    format!("crawl:robots:{}", host)
}

pub fn content_key(url: &str) -> String {
    format!("crawl:content:{}", url_hash(url))
}

pub fn queue_key(name: &str) -> String {
    format!("crawl:queue:{}", name)
}
