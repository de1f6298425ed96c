//! Robots.txt caching implementation
//!
//! A cached entry expires after its retention window, at which point the host
//! goes back to needing a fetch.

use crate::robots::ParsedRobots;
use chrono::{DateTime, Duration, Utc};

/// Cached robots.txt data for a host
#[derive(Debug, Clone)]
pub struct CachedRobots {
    /// The parsed robots.txt content
    pub robots: ParsedRobots,

    /// When the robots.txt was fetched (or loaded from the shared store)
    pub fetched_at: DateTime<Utc>,

    /// How long the entry stays fresh
    pub ttl: Duration,
}

impl CachedRobots {
    /// Creates a new CachedRobots stamped with the current time
    pub fn new(robots: ParsedRobots, ttl: Duration) -> Self {
        Self {
            robots,
            fetched_at: Utc::now(),
            ttl,
        }
    }

    /// Rebuilds an entry fetched earlier, keeping its original expiry
    pub fn restored(robots: ParsedRobots, fetched_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self {
            robots,
            fetched_at,
            ttl: expires_at - fetched_at,
        }
    }

    /// Checks if the entry has outlived its retention window
    pub fn is_stale(&self) -> bool {
        self.age() >= self.ttl
    }

    pub fn age(&self) -> Duration {
        Utc::now() - self.fetched_at
    }

    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        self.robots.is_allowed(url, user_agent)
    }

    pub fn crawl_delay(&self, user_agent: &str) -> Option<f64> {
        self.robots.crawl_delay(user_agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_cache_not_stale() {
        let cache = CachedRobots::new(ParsedRobots::allow_all(), Duration::hours(24));
        assert!(!cache.is_stale());
    }

    #[test]
    fn test_cache_is_stale_after_ttl() {
        let mut cache = CachedRobots::new(ParsedRobots::allow_all(), Duration::hours(24));
        cache.fetched_at = Utc::now() - Duration::hours(25);
        assert!(cache.is_stale());
    }

    #[test]
    fn test_cache_not_stale_within_ttl() {
        let mut cache = CachedRobots::new(ParsedRobots::allow_all(), Duration::hours(24));
        cache.fetched_at = Utc::now() - Duration::hours(23);
        assert!(!cache.is_stale());
    }

    #[test]
    fn test_zero_ttl_is_immediately_stale() {
        let cache = CachedRobots::new(ParsedRobots::allow_all(), Duration::zero());
        assert!(cache.is_stale());
    }

    #[test]
    fn test_restored_entry_keeps_original_expiry() {
        let fetched_at = Utc::now() - Duration::hours(23);
        let cache = CachedRobots::restored(
            ParsedRobots::allow_all(),
            fetched_at,
            fetched_at + Duration::hours(24),
        );
        assert!(!cache.is_stale());
        assert_eq!(cache.ttl, Duration::hours(24));

        let expired = CachedRobots::restored(
            ParsedRobots::allow_all(),
            Utc::now() - Duration::hours(25),
            Utc::now() - Duration::hours(1),
        );
        assert!(expired.is_stale());
    }

    #[test]
    fn test_delegates_to_robots() {
        let robots = ParsedRobots::from_content("User-agent: *\nDisallow: /x\nCrawl-delay: 4");
        let cache = CachedRobots::new(robots, Duration::hours(1));

        assert!(!cache.is_allowed("https://example.com/x", "TestBot"));
        assert!(cache.is_allowed("https://example.com/y", "TestBot"));
        assert_eq!(cache.crawl_delay("TestBot"), Some(4.0));
    }
}
