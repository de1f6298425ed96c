//! Configuration module for Crawl-Digest
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! with environment variable overrides for the crawler settings.
//!
//! # Example
//!
//! ```no_run
//! use crawl_digest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawl-digest.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ChunkingConfig, Config, CrawlerConfig, QueueConfig, StorageConfig, MAX_DELAY_SECS,
};

// Re-export parser functions
pub use parser::{apply_env_overrides, default_config, load_config, parse_config};
pub use validation::validate;
