//! Storage traits and error types
//!
//! This module defines the trait interface for the shared state store and
//! associated error types.

use crate::storage::{CachedContent, FrontierRecord, QueueItem, RobotsRecord, StoreStats};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during storage operations
///
/// Every variant means the shared state could not be trusted for this call.
/// The crawler surfaces all of them as `StoreUnavailable`.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Store unreachable: {0}")]
    Unavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Corrupt record {key}: {message}")]
    Corrupt { key: String, message: String },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for shared crawl-state backends
///
/// Implementations must be safe to share between concurrent workers. The
/// only cross-worker guarantee the crawler relies on is that
/// [`FrontierStore::mark_visited`] is an atomic set-if-not-exists.
pub trait FrontierStore: Send + Sync {
    // ===== Visited Set =====

    /// Records a URL as visited
    ///
    /// Returns `true` only for the caller whose call created the record.
    /// When a record already exists with an unknown status, a `Some` status
    /// fills it in once; the record is otherwise never modified.
    fn mark_visited(&self, url: &str, depth: u32, status_code: Option<u16>)
        -> StorageResult<bool>;

    /// Checks whether a live record exists for the URL
    fn is_visited(&self, url: &str) -> StorageResult<bool>;

    /// Gets the live record for a URL
    fn get_crawl_info(&self, url: &str) -> StorageResult<Option<FrontierRecord>>;

    // ===== Robots Cache =====

    /// Caches robots.txt text for a `scheme://host` key
    fn cache_robots(&self, host: &str, text: &str, ttl: Duration) -> StorageResult<()>;

    /// Gets the live robots.txt record, including when it was fetched
    fn get_robots_record(&self, host: &str) -> StorageResult<Option<RobotsRecord>>;

    /// Gets cached robots.txt text; an empty string means allow all
    fn get_robots(&self, host: &str) -> StorageResult<Option<String>> {
        Ok(self.get_robots_record(host)?.map(|record| record.text))
    }

    // ===== Content Cache =====

    fn cache_content(
        &self,
        url: &str,
        content: &str,
        content_type: &str,
        ttl: Duration,
    ) -> StorageResult<()>;

    fn get_cached_content(&self, url: &str) -> StorageResult<Option<CachedContent>>;

    // ===== Queues =====

    /// Queue used by the unnamed queue operations
    fn default_queue(&self) -> &str;

    /// Adds URLs at `depth` to a named queue
    ///
    /// Visited URLs and items already queued are skipped. Returns the number
    /// of items newly added.
    fn enqueue_to(&self, queue: &str, urls: &[String], depth: u32) -> StorageResult<usize>;

    /// Removes and returns one item; retrieval order is unspecified
    fn dequeue_from(&self, queue: &str) -> StorageResult<Option<QueueItem>>;

    /// Advisory size of a named queue
    fn queue_size_of(&self, queue: &str) -> StorageResult<u64>;

    /// Empties a named queue, returning how many items were dropped
    fn clear_queue(&self, queue: &str) -> StorageResult<u64>;

    // ===== Maintenance =====

    /// Deletes every record whose retention window has elapsed
    fn purge_expired(&self) -> StorageResult<u64>;

    /// Counts live records and the sizes of the given queues
    fn stats(&self, queues: &[&str]) -> StorageResult<StoreStats>;

    // ===== Default Queue Shorthands =====

    fn enqueue(&self, urls: &[String], depth: u32) -> StorageResult<usize> {
        self.enqueue_to(self.default_queue(), urls, depth)
    }

    fn dequeue_one(&self) -> StorageResult<Option<QueueItem>> {
        self.dequeue_from(self.default_queue())
    }

    fn queue_size(&self) -> StorageResult<u64> {
        self.queue_size_of(self.default_queue())
    }
}
