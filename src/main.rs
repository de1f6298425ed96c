//! Crawl-Digest main entry point
//!
//! This is the command-line interface for the crawler and chunking engine.

use anyhow::{bail, Context, Result};
use clap::Parser;
use crawl_digest::capabilities::JsonlKnowledgeStore;
use crawl_digest::config::{default_config, load_config, Config};
use crawl_digest::jobs::{cleanup_job, crawl_job, digest_job, JobContext, JobResult};
use crawl_digest::output::{job_result_json, load_statistics, print_statistics};
use crawl_digest::storage::{open_store, FrontierStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Crawl-Digest: a polite crawler that chunks what it reads
///
/// Crawls pages while respecting robots.txt and crawl delays, converts
/// them to markdown and splits them into hierarchical chunks.
#[derive(Parser, Debug)]
#[command(name = "crawl-digest")]
#[command(version)]
#[command(about = "A polite crawler and chunking engine", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Crawl a single URL
    #[arg(long, value_name = "URL", conflicts_with_all = ["digest", "stats", "cleanup", "clear_queue"])]
    crawl: Option<String>,

    /// Depth recorded for the single-URL crawl
    #[arg(long, default_value_t = 0, requires = "crawl")]
    depth: u32,

    /// Crawl recursively from a URL and chunk every page
    #[arg(long, value_name = "URL", conflicts_with_all = ["crawl", "stats", "cleanup", "clear_queue"])]
    digest: Option<String>,

    /// Maximum digest depth (defaults to the configured max-depth)
    #[arg(long, value_name = "N", requires = "digest")]
    max_depth: Option<u32>,

    /// Append digested chunks to this JSON Lines file
    #[arg(long, value_name = "FILE", requires = "digest")]
    knowledge_out: Option<PathBuf>,

    /// Show statistics from the shared store and exit
    #[arg(long, conflicts_with_all = ["crawl", "digest", "cleanup", "clear_queue"])]
    stats: bool,

    /// Purge expired records from the shared store
    #[arg(long, conflicts_with_all = ["crawl", "digest", "stats", "clear_queue"])]
    cleanup: bool,

    /// Remove every item from the named queue
    #[arg(long, value_name = "NAME", conflicts_with_all = ["crawl", "digest", "stats", "cleanup"])]
    clear_queue: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))?
        }
        None => default_config().context("invalid default configuration")?,
    };

    let store: Arc<dyn FrontierStore> = Arc::new(
        open_store(&config.storage, &config.queues.default).with_context(|| {
            format!("failed to open store at {}", config.storage.database_path)
        })?,
    );

    // Handle different modes
    if let Some(url) = &cli.crawl {
        handle_crawl(config, store, url, cli.depth).await
    } else if let Some(url) = &cli.digest {
        let max_depth = cli.max_depth.unwrap_or(config.crawler.max_depth);
        handle_digest(config, store, url, max_depth, cli.knowledge_out).await
    } else if cli.stats {
        handle_stats(&config, store.as_ref())
    } else if cli.cleanup {
        handle_cleanup(config, store).await
    } else if let Some(queue) = &cli.clear_queue {
        handle_clear_queue(store.as_ref(), queue)
    } else {
        bail!("no mode given; use --crawl, --digest, --stats, --cleanup or --clear-queue")
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("crawl_digest=info,warn"),
            1 => EnvFilter::new("crawl_digest=debug,info"),
            2 => EnvFilter::new("crawl_digest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Cancels in-progress sessions when Ctrl-C is pressed
fn cancel_on_ctrl_c(ctx: &JobContext) {
    let token = ctx.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current page");
            token.cancel();
        }
    });
}

/// Prints a job result and turns an error status into a failing exit
fn report(result: &JobResult) -> Result<()> {
    println!("{}", job_result_json(result)?);
    if !result.is_success() {
        bail!(
            "job failed: {}",
            result.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

/// Handles the --crawl mode: crawls one URL
async fn handle_crawl(
    config: Config,
    store: Arc<dyn FrontierStore>,
    url: &str,
    depth: u32,
) -> Result<()> {
    tracing::info!("Crawling {} at depth {}", url, depth);

    let ctx = JobContext::new(config, store)?;
    cancel_on_ctrl_c(&ctx);

    let result = crawl_job(&ctx, url, depth).await;
    report(&result)
}

/// Handles the --digest mode: recursive crawl plus chunking
async fn handle_digest(
    config: Config,
    store: Arc<dyn FrontierStore>,
    url: &str,
    max_depth: u32,
    knowledge_out: Option<PathBuf>,
) -> Result<()> {
    tracing::info!("Digesting {} to depth {}", url, max_depth);

    let mut ctx = JobContext::new(config, store)?;
    if let Some(path) = knowledge_out {
        tracing::info!("Writing chunks to {}", path.display());
        ctx = ctx.with_knowledge(Arc::new(JsonlKnowledgeStore::new(path)));
    }
    cancel_on_ctrl_c(&ctx);

    let result = digest_job(&ctx, url, max_depth).await;
    report(&result)
}

/// Handles the --stats mode: shows statistics from the shared store
fn handle_stats(config: &Config, store: &dyn FrontierStore) -> Result<()> {
    println!("Database: {}\n", config.storage.database_path);

    let stats = load_statistics(store, &config.queues)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --cleanup mode: purges expired records
async fn handle_cleanup(config: Config, store: Arc<dyn FrontierStore>) -> Result<()> {
    let ctx = JobContext::new(config, store)?;
    let result = cleanup_job(&ctx).await;
    report(&result)
}

/// Handles the --clear-queue mode
fn handle_clear_queue(store: &dyn FrontierStore, queue: &str) -> Result<()> {
    let removed = store
        .clear_queue(queue)
        .with_context(|| format!("failed to clear queue {}", queue))?;
    println!("✓ Removed {} items from queue '{}'", removed, queue);
    Ok(())
}
