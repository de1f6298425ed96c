//! Statistics from the shared crawl store
//!
//! This module provides functionality for extracting and displaying
//! frontier, cache and queue counters.

use crate::config::QueueConfig;
use crate::storage::{FrontierStore, StoreStats};
use std::fmt::Write;

/// Loads statistics for every configured queue
///
/// # Arguments
///
/// * `store` - The shared store to query
/// * `queues` - Queue names to report
///
/// # Returns
///
/// * `Ok(StoreStats)` - Successfully loaded statistics
/// * `Err(CrawlError::StoreUnavailable)` - Failed to query the store
pub fn load_statistics(store: &dyn FrontierStore, queues: &QueueConfig) -> crate::Result<StoreStats> {
    Ok(store.stats(&queues.names())?)
}

/// Formats statistics as a human-readable report
pub fn format_statistics(stats: &StoreStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Crawl Statistics ===\n");

    let _ = writeln!(out, "Overview:");
    let _ = writeln!(out, "  Crawled URLs: {}", stats.crawled_urls);
    let _ = writeln!(out, "  Cached robots.txt: {}", stats.cached_robots);
    let _ = writeln!(out, "  Cached pages: {}", stats.cached_content);
    let _ = writeln!(out);

    let _ = writeln!(out, "Queues:");
    // Largest queues first
    let mut queues: Vec<_> = stats.queue_sizes.iter().collect();
    queues.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

    let pending: u64 = stats.queue_sizes.values().sum();
    for (name, size) in queues {
        let percentage = if pending > 0 {
            (*size as f64 / pending as f64) * 100.0
        } else {
            0.0
        };
        let _ = writeln!(out, "  {}: {} ({:.1}%)", name, size, percentage);
    }
    let _ = writeln!(out);

    let _ = write!(out, "Pending: {} URLs across {} queues", pending, stats.queue_sizes.len());
    out
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &StoreStats) {
    println!("{}", format_statistics(stats));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_load_statistics_reports_every_queue() {
        let store = MemoryStore::new();
        store
            .enqueue(&["https://example.com/a".to_string()], 1)
            .unwrap();

        let stats = load_statistics(&store, &QueueConfig::default()).unwrap();
        assert_eq!(stats.queue_sizes.len(), 3);
        assert_eq!(stats.queue_sizes["default"], 1);
        assert_eq!(stats.queue_sizes["high"], 0);
    }

    #[test]
    fn test_format_statistics() {
        let mut stats = StoreStats {
            crawled_urls: 12,
            cached_robots: 2,
            cached_content: 9,
            ..StoreStats::default()
        };
        stats.queue_sizes.insert("default".to_string(), 3);
        stats.queue_sizes.insert("low".to_string(), 1);

        let report = format_statistics(&stats);
        assert!(report.contains("Crawled URLs: 12"));
        assert!(report.contains("default: 3 (75.0%)"));
        assert!(report.ends_with("Pending: 4 URLs across 2 queues"));
    }
}
