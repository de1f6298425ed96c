//! Recursive breadth-first crawl sessions
//!
//! A session drains a local FIFO worklist first and then the shared default
//! queue, so several sessions over one store cooperate on the same frontier.
//! Ordering across workers is best effort; the depth bound is not.

use crate::crawler::{CrawlOutcome, Crawler};
use crate::state::FailureReason;
use crate::storage::QueueItem;
use crate::CrawlError;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Runs recursive crawls on top of a [`Crawler`]
///
/// # Example
///
/// ```no_run
/// use crawl_digest::{Config, CrawlSession, Crawler, MemoryStore};
/// use std::sync::Arc;
///
/// # async fn run() -> crawl_digest::Result<()> {
/// let crawler = Crawler::new(Arc::new(Config::default()), Arc::new(MemoryStore::new()))?;
/// let session = CrawlSession::new(Arc::new(crawler));
///
/// let cancel = session.cancel_token();
/// tokio::spawn(async move {
///     let _ = tokio::signal::ctrl_c().await;
///     cancel.cancel();
/// });
///
/// let outcomes = session.crawl_recursive("https://example.com/", 1).await?;
/// # Ok(())
/// # }
/// ```
pub struct CrawlSession {
    crawler: Arc<Crawler>,
    cancel: CancellationToken,
}

impl CrawlSession {
    pub fn new(crawler: Arc<Crawler>) -> Self {
        Self::with_cancel(crawler, CancellationToken::new())
    }

    /// Creates a session that stops when `cancel` fires
    pub fn with_cancel(crawler: Arc<Crawler>, cancel: CancellationToken) -> Self {
        Self { crawler, cancel }
    }

    /// Token that stops the session before its next step
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn crawler(&self) -> &Arc<Crawler> {
        &self.crawler
    }

    /// Crawls a single URL unless the session was cancelled
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlOutcome)` - The attempt's outcome
    /// * `Err(CrawlError::Cancelled)` - The session was cancelled first
    /// * `Err(CrawlError::StoreUnavailable)` - The shared store failed
    pub async fn crawl_one(&self, url: &str, depth: u32) -> crate::Result<CrawlOutcome> {
        if self.is_cancelled() {
            return Err(CrawlError::Cancelled);
        }
        self.crawler.crawl_url(url, depth).await
    }

    /// Crawls breadth-first from `seed` down to `max_depth`
    ///
    /// Returns the outcome of every attempted URL, in crawl order. URLs that
    /// another traversal already claimed, and queue items deeper than
    /// `max_depth`, are skipped silently. Cancellation stops the session
    /// between steps and returns what was crawled so far.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<CrawlOutcome>)` - Outcomes of the session
    /// * `Err(CrawlError::StoreUnavailable)` - The shared store failed; the
    ///   session stopped to avoid duplicate crawling
    pub async fn crawl_recursive(
        &self,
        seed: &str,
        max_depth: u32,
    ) -> crate::Result<Vec<CrawlOutcome>> {
        tracing::info!("Starting recursive crawl of {} (max depth {})", seed, max_depth);

        let store = Arc::clone(self.crawler.store());
        let mut worklist: VecDeque<QueueItem> = VecDeque::from([QueueItem::new(seed, 0)]);
        let mut seen: HashSet<String> = HashSet::from([seed.to_string()]);
        let mut outcomes = Vec::new();
        let mut attempted = 0usize;
        let start_time = Instant::now();

        loop {
            if self.is_cancelled() {
                tracing::info!("Crawl cancelled after {} pages", attempted);
                break;
            }

            let item = match worklist.pop_front() {
                Some(item) => item,
                None => match store.dequeue_one()? {
                    Some(item) => item,
                    None => {
                        tracing::info!("Work list and shared queue are empty, crawl complete");
                        break;
                    }
                },
            };

            if item.depth > max_depth {
                tracing::debug!("Skipping {} at depth {}", item.url, item.depth);
                continue;
            }

            let (outcome, _) = self
                .crawler
                .crawl_traced(&item.url, item.depth, max_depth)
                .await?;

            match &outcome {
                CrawlOutcome::Skipped {
                    reason: FailureReason::AlreadyVisited | FailureReason::DepthExceeded,
                    ..
                } => continue,
                CrawlOutcome::Success(result) if item.depth < max_depth => {
                    for link in &result.links {
                        if seen.insert(link.clone()) {
                            worklist.push_back(QueueItem::new(link.clone(), item.depth + 1));
                        }
                    }
                }
                CrawlOutcome::Failed { url, message, .. } => {
                    tracing::error!("Error processing {}: {}", url, message);
                }
                _ => {}
            }

            outcomes.push(outcome);
            attempted += 1;

            if attempted % 10 == 0 {
                let rate = attempted as f64 / start_time.elapsed().as_secs_f64();
                tracing::info!(
                    "Progress: {} pages crawled, {} in work list, {:.2} pages/sec",
                    attempted,
                    worklist.len(),
                    rate
                );
            }
        }

        tracing::info!(
            "Crawl completed: {} pages attempted in {:?}",
            attempted,
            start_time.elapsed()
        );

        Ok(outcomes)
    }
}
