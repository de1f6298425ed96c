//! Output module for crawl summaries and statistics
//!
//! This module handles:
//! - Summarizing the outcomes of a crawl session
//! - Printing shared-store statistics
//! - Rendering job results as JSON

pub mod stats;
mod summary;

pub use stats::{format_statistics, load_statistics, print_statistics};
pub use summary::{print_summary, CrawlSummary};

use crate::jobs::JobResult;

/// Renders a job result as pretty-printed JSON
pub fn job_result_json(result: &JobResult) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(result)
}
