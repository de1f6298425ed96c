//! Per-URL traversal
//!
//! [`Crawler::crawl_url`] walks one URL through the traversal state machine:
//!
//! ```text
//! Pending -> CheckingRobots -> Fetching -> Extracting -> QueuingChildren -> Done
//!     \___________\______________\____________\________________\-> Failed(reason)
//! ```
//!
//! The URL is claimed in the shared store (atomic `mark_visited`) before
//! any network I/O, so concurrent workers never crawl the same URL twice.
//! The claim's status code is filled in once the fetch settles.

use crate::capabilities::ProcessorRegistry;
use crate::config::{Config, MAX_DELAY_SECS};
use crate::crawler::content::{normalize_response, ExtractOptions};
use crate::crawler::fetcher::{build_http_client, fetch};
use crate::crawler::{CrawlOutcome, CrawlResult};
use crate::robots::PolitenessChecker;
use crate::state::{FailureReason, TraversalState, TraversalTrace};
use crate::storage::FrontierStore;
use crate::url::validate_url;
use crate::{CrawlError, FetchError};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Crawls single URLs against a shared frontier store
///
/// Cheap to share behind an `Arc`; several crawlers (in one process or
/// several) may use the same store concurrently.
pub struct Crawler {
    config: Arc<Config>,
    client: Client,
    store: Arc<dyn FrontierStore>,
    politeness: PolitenessChecker,
    processors: Arc<ProcessorRegistry>,
}

impl Crawler {
    /// Creates a crawler with the default content processors
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Ready to crawl
    /// * `Err(CrawlError::Fetch)` - The HTTP client could not be built
    pub fn new(config: Arc<Config>, store: Arc<dyn FrontierStore>) -> crate::Result<Self> {
        let client = build_http_client(&config.crawler).map_err(|e| {
            CrawlError::Fetch(FetchError::Http {
                url: String::new(),
                source: e,
            })
        })?;

        let politeness = PolitenessChecker::new(
            client.clone(),
            Arc::clone(&store),
            config.crawler.user_agent.clone(),
            config.storage.robots_ttl(),
            config.crawler.max_content_size,
        );

        Ok(Self {
            config,
            client,
            store,
            politeness,
            processors: Arc::new(ProcessorRegistry::with_defaults()),
        })
    }

    /// Replaces the content processors used for non-HTML bodies
    pub fn with_processors(mut self, processors: Arc<ProcessorRegistry>) -> Self {
        self.processors = processors;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn FrontierStore> {
        &self.store
    }

    pub fn politeness(&self) -> &PolitenessChecker {
        &self.politeness
    }

    pub fn processors(&self) -> &Arc<ProcessorRegistry> {
        &self.processors
    }

    /// Crawls one URL with the configured maximum depth
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlOutcome)` - Success, skip, or per-URL failure
    /// * `Err(CrawlError::StoreUnavailable)` - The shared store failed; the
    ///   caller must stop crawling
    pub async fn crawl_url(&self, url: &str, depth: u32) -> crate::Result<CrawlOutcome> {
        let max_depth = self.config.crawler.max_depth;
        let (outcome, _) = self.crawl_traced(url, depth, max_depth).await?;
        Ok(outcome)
    }

    /// Crawls one URL and returns the states the attempt passed through
    #[instrument(skip(self, url_str), fields(url = %url_str))]
    pub async fn crawl_traced(
        &self,
        url_str: &str,
        depth: u32,
        max_depth: u32,
    ) -> crate::Result<(CrawlOutcome, TraversalTrace)> {
        let mut trace = TraversalTrace::new();
        let outcome = self
            .crawl_with(url_str, depth, max_depth, &mut trace)
            .await?;

        let path = trace
            .states()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" -> ");
        debug!("Traversal of {}: {}", url_str, path);

        Ok((outcome, trace))
    }

    async fn crawl_with(
        &self,
        url_str: &str,
        depth: u32,
        max_depth: u32,
        trace: &mut TraversalTrace,
    ) -> crate::Result<CrawlOutcome> {
        let url = match validate_url(url_str) {
            Ok(url) => url,
            Err(e) => {
                return Ok(fail(trace, url_str, FailureReason::InvalidUrl, e.to_string()));
            }
        };
        let key = url.as_str().to_string();

        if depth > max_depth {
            return Ok(skip(trace, &key, FailureReason::DepthExceeded));
        }

        if !self.store.mark_visited(&key, depth, None)? {
            debug!("Already visited: {}", key);
            return Ok(skip(trace, &key, FailureReason::AlreadyVisited));
        }

        // Robots policy
        trace.advance(TraversalState::CheckingRobots);
        match self.politeness.is_allowed(&url).await {
            Ok(true) => {}
            Ok(false) => {
                let err = CrawlError::RobotsDisallowed { url: key.clone() };
                info!("{}", err);
                return Ok(fail(trace, &key, FailureReason::RobotsDisallowed, err.to_string()));
            }
            Err(e @ CrawlError::StoreUnavailable(_)) => return Err(e),
            Err(e) => {
                warn!("{}", e);
                return Ok(fail(trace, &key, FailureReason::RobotsFetchError, e.to_string()));
            }
        }

        let robots_delay = match self.politeness.crawl_delay(&url).await {
            Ok(delay) => delay,
            Err(e @ CrawlError::StoreUnavailable(_)) => return Err(e),
            Err(e) => {
                warn!("{}", e);
                None
            }
        };
        let delay = politeness_delay(self.config.crawler.delay_duration(), robots_delay);
        if !delay.is_zero() {
            debug!("Waiting {:?} before fetching {}", delay, key);
            tokio::time::sleep(delay).await;
        }

        // Fetch
        trace.advance(TraversalState::Fetching);
        let response = match fetch(&self.client, &key, self.config.crawler.max_content_size).await
        {
            Ok(response) => response,
            Err(e) => {
                self.store
                    .mark_visited(&key, depth, Some(e.status_code().unwrap_or(0)))?;
                warn!("{}", e);
                return Ok(fail(trace, &key, FailureReason::FetchError, e.to_string()));
            }
        };

        // Extract
        trace.advance(TraversalState::Extracting);
        let options = ExtractOptions {
            follow_links: depth < max_depth,
            same_domain_only: self.config.crawler.same_domain_only,
        };
        // Relative links resolve against where redirects landed
        let base = Url::parse(&response.final_url).unwrap_or_else(|_| url.clone());
        if base != url {
            debug!("{} redirected to {}", key, base);
        }
        let normalized = normalize_response(&response, &base, options, &self.processors).await;

        // Queue children
        trace.advance(TraversalState::QueuingChildren);
        if !normalized.links.is_empty() {
            let queued = self.store.enqueue(&normalized.links, depth + 1)?;
            debug!("Queued {} of {} links from {}", queued, normalized.links.len(), key);
        }

        self.store
            .mark_visited(&key, depth, Some(response.status_code))?;
        self.store.cache_content(
            &key,
            &normalized.content,
            &normalized.content_type,
            self.config.storage.content_ttl(),
        )?;

        trace.advance(TraversalState::Done);
        info!("Crawled {} (depth {}, {} links)", key, depth, normalized.links.len());

        Ok(CrawlOutcome::Success(CrawlResult {
            url: key,
            depth,
            content_type: normalized.content_type,
            content: normalized.content,
            links: normalized.links,
            status_code: response.status_code,
            title: normalized.title,
        }))
    }
}

/// Delay before a fetch: the larger of the configured and robots delays,
/// capped at [`MAX_DELAY_SECS`]
pub fn politeness_delay(configured: Duration, robots_delay: Option<f64>) -> Duration {
    let cap = Duration::from_secs_f64(MAX_DELAY_SECS);
    let robots = robots_delay
        .filter(|secs| secs.is_finite() && *secs > 0.0)
        .map(|secs| Duration::from_secs_f64(secs.min(MAX_DELAY_SECS)))
        .unwrap_or(Duration::ZERO);
    configured.max(robots).min(cap)
}

fn skip(trace: &mut TraversalTrace, url: &str, reason: FailureReason) -> CrawlOutcome {
    trace.advance(TraversalState::Failed(reason));
    CrawlOutcome::Skipped {
        url: url.to_string(),
        reason,
    }
}

fn fail(
    trace: &mut TraversalTrace,
    url: &str,
    reason: FailureReason,
    message: String,
) -> CrawlOutcome {
    trace.advance(TraversalState::Failed(reason));
    CrawlOutcome::Failed {
        url: url.to_string(),
        reason,
        message,
    }
}
