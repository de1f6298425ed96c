//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the FrontierStore trait.
//! Several worker processes may open the same database file; every
//! read-modify-write runs inside an IMMEDIATE transaction so the claim on a
//! URL is atomic across them.

use crate::config::StorageConfig;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{FrontierStore, StorageError, StorageResult};
use crate::storage::{
    content_key, queue_key, robots_key, url_key, CachedContent, FrontierRecord, QueueItem,
    RobotsRecord, StoreStats,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// SQLite storage backend
pub struct SqliteStore {
    conn: Mutex<Connection>,
    url_ttl: Duration,
    default_queue: String,
}

impl SqliteStore {
    /// Opens or creates the database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `config` - Retention windows and busy timeout
    /// * `default_queue` - Queue used by the unnamed queue operations
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - The database could not be opened
    pub fn open(path: &Path, config: &StorageConfig, default_queue: &str) -> StorageResult<Self> {
        let conn = Connection::open(path).map_err(|e| {
            StorageError::Unavailable(format!("cannot open {}: {}", path.display(), e))
        })?;

        conn.busy_timeout(Duration::from_millis(config.busy_timeout))?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;
        tracing::debug!("Opened state store at {}", path.display());

        Ok(Self::from_connection(conn, config, default_queue))
    }

    /// Creates an in-memory database with default settings
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::open_in_memory_with(&StorageConfig::default())
    }

    pub fn open_in_memory_with(config: &StorageConfig) -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self::from_connection(conn, config, "default"))
    }

    fn from_connection(conn: Connection, config: &StorageConfig, default_queue: &str) -> Self {
        Self {
            conn: Mutex::new(conn),
            url_ttl: config.url_ttl(),
            default_queue: default_queue.to_string(),
        }
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Unavailable("connection lock poisoned".to_string()))
    }
}

fn expires_at(now: DateTime<Utc>, ttl: Duration) -> i64 {
    now.timestamp()
        .saturating_add(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX))
}

fn parse_timestamp(key: &str, raw: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Corrupt {
            key: key.to_string(),
            message: e.to_string(),
        })
}

impl FrontierStore for SqliteStore {
    // ===== Visited Set =====

    fn mark_visited(
        &self,
        url: &str,
        depth: u32,
        status_code: Option<u16>,
    ) -> StorageResult<bool> {
        let key = url_key(url);
        let now = Utc::now();
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        // An expired record no longer blocks a fresh claim
        tx.execute(
            "DELETE FROM visited WHERE key = ?1 AND expires_at <= ?2",
            params![key, now.timestamp()],
        )?;

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO visited (key, url, depth, status_code, crawled_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                key,
                url,
                depth,
                status_code,
                now.to_rfc3339(),
                expires_at(now, self.url_ttl)
            ],
        )?;

        if inserted == 0 {
            if let Some(status) = status_code {
                tx.execute(
                    "UPDATE visited SET status_code = ?1 WHERE key = ?2 AND status_code IS NULL",
                    params![status, key],
                )?;
            }
        }

        tx.commit()?;
        Ok(inserted == 1)
    }

    fn is_visited(&self, url: &str) -> StorageResult<bool> {
        let conn = self.lock()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM visited WHERE key = ?1 AND expires_at > ?2",
                params![url_key(url), Utc::now().timestamp()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn get_crawl_info(&self, url: &str) -> StorageResult<Option<FrontierRecord>> {
        let key = url_key(url);
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT url, depth, status_code, crawled_at FROM visited
                 WHERE key = ?1 AND expires_at > ?2",
                params![key, Utc::now().timestamp()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, u32>(1)?,
                        row.get::<_, Option<u16>>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(url, depth, status_code, crawled_at)| {
            Ok(FrontierRecord {
                url,
                depth,
                status_code,
                crawled_at: parse_timestamp(&key, &crawled_at)?,
            })
        })
        .transpose()
    }

    // ===== Robots Cache =====

    fn cache_robots(&self, host: &str, text: &str, ttl: Duration) -> StorageResult<()> {
        let now = Utc::now();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO robots (key, body, fetched_at, expires_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(key) DO UPDATE SET
                body = excluded.body,
                fetched_at = excluded.fetched_at,
                expires_at = excluded.expires_at",
            params![robots_key(host), text, now.to_rfc3339(), expires_at(now, ttl)],
        )?;
        Ok(())
    }

    fn get_robots_record(&self, host: &str) -> StorageResult<Option<RobotsRecord>> {
        let key = robots_key(host);
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT body, fetched_at, expires_at FROM robots WHERE key = ?1 AND expires_at > ?2",
                params![key, Utc::now().timestamp()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(text, fetched_at, expires_at)| {
            let fetched_at = parse_timestamp(&key, &fetched_at)?;
            let expires_at =
                DateTime::from_timestamp(expires_at, 0).ok_or_else(|| StorageError::Corrupt {
                    key: key.clone(),
                    message: format!("expiry {} out of range", expires_at),
                })?;
            Ok(RobotsRecord {
                text,
                fetched_at,
                expires_at,
            })
        })
        .transpose()
    }

    // ===== Content Cache =====

    fn cache_content(
        &self,
        url: &str,
        content: &str,
        content_type: &str,
        ttl: Duration,
    ) -> StorageResult<()> {
        let now = Utc::now();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO content (key, content, content_type, cached_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(key) DO UPDATE SET
                content = excluded.content,
                content_type = excluded.content_type,
                cached_at = excluded.cached_at,
                expires_at = excluded.expires_at",
            params![
                content_key(url),
                content,
                content_type,
                now.to_rfc3339(),
                expires_at(now, ttl)
            ],
        )?;
        Ok(())
    }

    fn get_cached_content(&self, url: &str) -> StorageResult<Option<CachedContent>> {
        let key = content_key(url);
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT content, content_type, cached_at FROM content
                 WHERE key = ?1 AND expires_at > ?2",
                params![key, Utc::now().timestamp()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(content, content_type, cached_at)| {
            Ok(CachedContent {
                content,
                content_type,
                cached_at: parse_timestamp(&key, &cached_at)?,
            })
        })
        .transpose()
    }

    // ===== Queues =====

    fn default_queue(&self) -> &str {
        &self.default_queue
    }

    fn enqueue_to(&self, queue: &str, urls: &[String], depth: u32) -> StorageResult<usize> {
        let queue = queue_key(queue);
        let now = Utc::now().timestamp();
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut added = 0;
        for url in urls {
            let visited = tx
                .query_row(
                    "SELECT 1 FROM visited WHERE key = ?1 AND expires_at > ?2",
                    params![url_key(url), now],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if visited {
                continue;
            }

            let member = QueueItem::new(url.as_str(), depth).to_member()?;
            added += tx.execute(
                "INSERT OR IGNORE INTO queue_items (queue, member) VALUES (?1, ?2)",
                params![queue, member],
            )?;
        }

        tx.commit()?;
        Ok(added)
    }

    fn dequeue_from(&self, queue: &str) -> StorageResult<Option<QueueItem>> {
        let queue = queue_key(queue);
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let picked: Option<(i64, String)> = tx
            .query_row(
                "SELECT id, member FROM queue_items WHERE queue = ?1 ORDER BY RANDOM() LIMIT 1",
                params![queue],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((id, member)) = picked else {
            return Ok(None);
        };

        tx.execute("DELETE FROM queue_items WHERE id = ?1", params![id])?;
        tx.commit()?;

        QueueItem::from_member(&member).map(Some)
    }

    fn queue_size_of(&self, queue: &str) -> StorageResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM queue_items WHERE queue = ?1",
            params![queue_key(queue)],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn clear_queue(&self, queue: &str) -> StorageResult<u64> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM queue_items WHERE queue = ?1",
            params![queue_key(queue)],
        )?;
        Ok(removed as u64)
    }

    // ===== Maintenance =====

    fn purge_expired(&self) -> StorageResult<u64> {
        let now = Utc::now().timestamp();
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let mut removed = 0;
        for table in ["visited", "robots", "content"] {
            removed += tx.execute(
                &format!("DELETE FROM {} WHERE expires_at <= ?1", table),
                params![now],
            )?;
        }

        tx.commit()?;
        Ok(removed as u64)
    }

    fn stats(&self, queues: &[&str]) -> StorageResult<StoreStats> {
        let now = Utc::now().timestamp();
        let conn = self.lock()?;

        let count_live = |table: &str| -> StorageResult<u64> {
            let count: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM {} WHERE expires_at > ?1", table),
                params![now],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        };

        let mut stats = StoreStats {
            crawled_urls: count_live("visited")?,
            cached_robots: count_live("robots")?,
            cached_content: count_live("content")?,
            ..StoreStats::default()
        };

        for queue in queues {
            let size: i64 = conn.query_row(
                "SELECT COUNT(*) FROM queue_items WHERE queue = ?1",
                params![queue_key(queue)],
                |row| row.get(0),
            )?;
            stats.queue_sizes.insert(queue.to_string(), size as u64);
        }

        Ok(stats)
    }
}
