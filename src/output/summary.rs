//! Session summaries

use crate::crawler::CrawlOutcome;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Counts of outcomes from one crawl session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,

    /// Deepest successfully crawled page
    pub max_depth_reached: u32,

    pub total_links: usize,

    /// Failure and skip counts keyed by reason
    pub reasons: BTreeMap<String, usize>,
}

impl CrawlSummary {
    pub fn from_outcomes(outcomes: &[CrawlOutcome]) -> Self {
        let mut summary = Self {
            attempted: outcomes.len(),
            ..Self::default()
        };

        for outcome in outcomes {
            match outcome {
                CrawlOutcome::Success(result) => {
                    summary.succeeded += 1;
                    summary.total_links += result.links.len();
                    summary.max_depth_reached = summary.max_depth_reached.max(result.depth);
                }
                CrawlOutcome::Skipped { .. } => summary.skipped += 1,
                CrawlOutcome::Failed { .. } => summary.failed += 1,
            }
            if let Some(reason) = outcome.failure_reason() {
                *summary.reasons.entry(reason.as_str().to_string()).or_default() += 1;
            }
        }

        summary
    }

    /// Percentage of attempts that succeeded
    pub fn success_rate(&self) -> f64 {
        if self.attempted == 0 {
            return 0.0;
        }
        (self.succeeded as f64 / self.attempted as f64) * 100.0
    }
}

/// Prints a session summary to stdout
pub fn print_summary(summary: &CrawlSummary) {
    println!("=== Crawl Summary ===\n");
    println!("  Attempted: {}", summary.attempted);
    println!("  Succeeded: {}", summary.succeeded);
    println!("  Skipped: {}", summary.skipped);
    println!("  Failed: {}", summary.failed);
    println!("  Links found: {}", summary.total_links);
    println!("  Deepest page: {}", summary.max_depth_reached);

    if !summary.reasons.is_empty() {
        println!();
        println!("Reasons:");
        for (reason, count) in &summary.reasons {
            println!("  {}: {}", reason, count);
        }
    }

    println!();
    println!(
        "Success Rate: {:.1}% ({} / {} pages)",
        summary.success_rate(),
        summary.succeeded,
        summary.attempted
    );
}
