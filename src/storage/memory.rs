//! In-process implementation of the FrontierStore trait
//!
//! Used for single-process runs and as the substitute store in tests. The
//! retention and claim semantics match the SQLite backend; queues happen to
//! drain in insertion order, which callers must not rely on.

use crate::storage::traits::{FrontierStore, StorageError, StorageResult};
use crate::storage::{
    content_key, queue_key, robots_key, url_key, CachedContent, FrontierRecord, QueueItem,
    RobotsRecord, StoreStats,
};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Clone)]
struct Expiring<T> {
    value: T,
    expires_at: DateTime<Utc>,
}

impl<T> Expiring<T> {
    fn new(value: T, ttl: Duration) -> Self {
        let ttl =
            chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(36_500));
        Self {
            value,
            expires_at: Utc::now() + ttl,
        }
    }

    fn is_live(&self) -> bool {
        self.expires_at > Utc::now()
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    visited: HashMap<String, Expiring<FrontierRecord>>,
    robots: HashMap<String, Expiring<(String, DateTime<Utc>)>>,
    content: HashMap<String, Expiring<CachedContent>>,
    queues: HashMap<String, VecDeque<String>>,
}

impl MemoryState {
    fn live_visited(&self, key: &str) -> Option<&FrontierRecord> {
        self.visited
            .get(key)
            .filter(|entry| entry.is_live())
            .map(|entry| &entry.value)
    }
}

/// Mutex-guarded in-memory store
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    url_ttl: Duration,
    default_queue: String,
    unavailable: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_url_ttl(Duration::from_secs(7 * 24 * 3600))
    }

    pub fn with_url_ttl(url_ttl: Duration) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            url_ttl,
            default_queue: "default".to_string(),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Makes every subsequent call fail as if the store were unreachable
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, MemoryState>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(
                "memory store marked unavailable".to_string(),
            ));
        }
        self.state
            .lock()
            .map_err(|_| StorageError::Unavailable("state lock poisoned".to_string()))
    }
}

impl FrontierStore for MemoryStore {
    fn mark_visited(
        &self,
        url: &str,
        depth: u32,
        status_code: Option<u16>,
    ) -> StorageResult<bool> {
        let key = url_key(url);
        let mut state = self.lock()?;

        if let Some(entry) = state.visited.get_mut(&key).filter(|e| e.is_live()) {
            if entry.value.status_code.is_none() {
                entry.value.status_code = status_code;
            }
            return Ok(false);
        }

        let record = FrontierRecord {
            url: url.to_string(),
            depth,
            status_code,
            crawled_at: Utc::now(),
        };
        state.visited.insert(key, Expiring::new(record, self.url_ttl));
        Ok(true)
    }

    fn is_visited(&self, url: &str) -> StorageResult<bool> {
        Ok(self.lock()?.live_visited(&url_key(url)).is_some())
    }

    fn get_crawl_info(&self, url: &str) -> StorageResult<Option<FrontierRecord>> {
        Ok(self.lock()?.live_visited(&url_key(url)).cloned())
    }

    fn cache_robots(&self, host: &str, text: &str, ttl: Duration) -> StorageResult<()> {
        let entry = Expiring::new((text.to_string(), Utc::now()), ttl);
        self.lock()?.robots.insert(robots_key(host), entry);
        Ok(())
    }

    fn get_robots_record(&self, host: &str) -> StorageResult<Option<RobotsRecord>> {
        Ok(self
            .lock()?
            .robots
            .get(&robots_key(host))
            .filter(|e| e.is_live())
            .map(|e| RobotsRecord {
                text: e.value.0.clone(),
                fetched_at: e.value.1,
                expires_at: e.expires_at,
            }))
    }

    fn cache_content(
        &self,
        url: &str,
        content: &str,
        content_type: &str,
        ttl: Duration,
    ) -> StorageResult<()> {
        let cached = CachedContent {
            content: content.to_string(),
            content_type: content_type.to_string(),
            cached_at: Utc::now(),
        };
        self.lock()?
            .content
            .insert(content_key(url), Expiring::new(cached, ttl));
        Ok(())
    }

    fn get_cached_content(&self, url: &str) -> StorageResult<Option<CachedContent>> {
        Ok(self
            .lock()?
            .content
            .get(&content_key(url))
            .filter(|e| e.is_live())
            .map(|e| e.value.clone()))
    }

    fn default_queue(&self) -> &str {
        &self.default_queue
    }

    fn enqueue_to(&self, queue: &str, urls: &[String], depth: u32) -> StorageResult<usize> {
        let mut state = self.lock()?;
        let mut members = Vec::new();
        for url in urls {
            if state.live_visited(&url_key(url)).is_some() {
                continue;
            }
            members.push(QueueItem::new(url.as_str(), depth).to_member()?);
        }

        let items = state.queues.entry(queue_key(queue)).or_default();
        let mut added = 0;
        for member in members {
            if !items.contains(&member) {
                items.push_back(member);
                added += 1;
            }
        }
        Ok(added)
    }

    fn dequeue_from(&self, queue: &str) -> StorageResult<Option<QueueItem>> {
        let member = self
            .lock()?
            .queues
            .get_mut(&queue_key(queue))
            .and_then(|items| items.pop_front());
        member.map(|m| QueueItem::from_member(&m)).transpose()
    }

    fn queue_size_of(&self, queue: &str) -> StorageResult<u64> {
        Ok(self
            .lock()?
            .queues
            .get(&queue_key(queue))
            .map_or(0, |items| items.len() as u64))
    }

    fn clear_queue(&self, queue: &str) -> StorageResult<u64> {
        Ok(self
            .lock()?
            .queues
            .remove(&queue_key(queue))
            .map_or(0, |items| items.len() as u64))
    }

    fn purge_expired(&self) -> StorageResult<u64> {
        let mut state = self.lock()?;
        let before = state.visited.len() + state.robots.len() + state.content.len();
        state.visited.retain(|_, e| e.is_live());
        state.robots.retain(|_, e| e.is_live());
        state.content.retain(|_, e| e.is_live());
        let after = state.visited.len() + state.robots.len() + state.content.len();
        Ok((before - after) as u64)
    }

    fn stats(&self, queues: &[&str]) -> StorageResult<StoreStats> {
        let state = self.lock()?;
        let mut stats = StoreStats {
            crawled_urls: state.visited.values().filter(|e| e.is_live()).count() as u64,
            cached_robots: state.robots.values().filter(|e| e.is_live()).count() as u64,
            cached_content: state.content.values().filter(|e| e.is_live()).count() as u64,
            ..StoreStats::default()
        };
        for queue in queues {
            let size = state
                .queues
                .get(&queue_key(queue))
                .map_or(0, |items| items.len() as u64);
            stats.queue_sizes.insert(queue.to_string(), size);
        }
        Ok(stats)
    }
}
