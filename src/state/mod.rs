//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `TraversalState`: steps of a single URL's crawl attempt, ending in `Done` or `Failed`
//! - `FailureReason`: why an attempt ended early (skips and errors)
//! - `HostState`: per-host robots.txt lifecycle used by the politeness checker

mod host_state;
mod traversal_state;

// Re-export main types
pub use host_state::HostState;
pub use traversal_state::{FailureReason, TraversalState, TraversalTrace};
