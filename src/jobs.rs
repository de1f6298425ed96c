//! Job entry points
//!
//! Each job is a plain async function over a shared [`JobContext`] that
//! returns a serializable [`JobResult`]. Jobs never return `Err`: every
//! failure is reported in the record, so any queue runtime or the CLI can
//! invoke them the same way.

use crate::capabilities::{KnowledgeStore, ParserRegistry};
use crate::chunking::{enrich, select_strategy, ChunkForest, ChunkingEngine, PlatformMetadata};
use crate::config::Config;
use crate::crawler::{strip_source_marker, CrawlOutcome, CrawlResult, CrawlSession, Crawler};
use crate::output::CrawlSummary;
use crate::storage::FrontierStore;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Pages with less meaningful text than this are not chunked
pub const MIN_DIGEST_CHARS: usize = 50;

/// Overall status of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Success,
    Error,
}

/// Record returned by every job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub ids: Vec<String>,
}

impl JobResult {
    pub fn success(data: Value) -> Self {
        Self {
            status: JobStatus::Success,
            data: Some(data),
            error: None,
            ids: Vec::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Error,
            data: None,
            error: Some(message.into()),
            ids: Vec::new(),
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_ids(mut self, ids: Vec<String>) -> Self {
        self.ids = ids;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Success
    }
}

/// Shared collaborators for all jobs
pub struct JobContext {
    config: Arc<Config>,
    store: Arc<dyn FrontierStore>,
    crawler: Arc<Crawler>,
    parsers: ParserRegistry,
    engine: ChunkingEngine,
    knowledge: Option<Arc<dyn KnowledgeStore>>,
    cancel: CancellationToken,
}

impl JobContext {
    /// Builds a context with the default parsers and processors and no
    /// knowledge store
    pub fn new(config: Config, store: Arc<dyn FrontierStore>) -> crate::Result<Self> {
        let config = Arc::new(config);
        let crawler = Crawler::new(Arc::clone(&config), Arc::clone(&store))?;
        let engine = ChunkingEngine::new(config.chunking.clone());

        Ok(Self {
            config,
            store,
            crawler: Arc::new(crawler),
            parsers: ParserRegistry::with_defaults(),
            engine,
            knowledge: None,
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_knowledge(mut self, knowledge: Arc<dyn KnowledgeStore>) -> Self {
        self.knowledge = Some(knowledge);
        self
    }

    pub fn with_parsers(mut self, parsers: ParserRegistry) -> Self {
        self.parsers = parsers;
        self
    }

    pub fn with_engine(mut self, engine: ChunkingEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Token that cancels sessions started from this context
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn FrontierStore> {
        &self.store
    }

    fn session(&self) -> CrawlSession {
        CrawlSession::with_cancel(Arc::clone(&self.crawler), self.cancel.clone())
    }
}

/// Crawls a single URL
///
/// A successful page is also run through the platform parsers; a claimed
/// page carries the parser's output under `parsed`.
#[instrument(skip(ctx))]
pub async fn crawl_job(ctx: &JobContext, url: &str, depth: u32) -> JobResult {
    info!("Starting crawl of {} at depth {}", url, depth);

    let outcome = match ctx.session().crawl_one(url, depth).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!("Crawl of {} failed: {}", url, e);
            return JobResult::error(e.to_string());
        }
    };

    match outcome {
        CrawlOutcome::Success(result) => {
            let mut data = match serde_json::to_value(&result) {
                Ok(data) => data,
                Err(e) => return JobResult::error(e.to_string()),
            };
            if let Some(parser) = ctx.parsers.find(&result.url) {
                match parser.parse(&result.url, &result.content, &result.content_type) {
                    Ok(parsed) => {
                        data["parsed"] = json!(parsed);
                        info!("Applied {} parser to {}", parser.name(), result.url);
                    }
                    Err(e) => warn!("Parser failed for {}: {}", result.url, e),
                }
            }
            info!("Successfully crawled {}", result.url);
            JobResult::success(data)
        }
        other => {
            let reason = other.reason().unwrap_or_default();
            warn!("Did not crawl {}: {}", other.url(), reason);
            JobResult::error(format!("{}: {}", other.status(), reason)).with_data(json!({
                "url": other.url(),
                "outcome": other.status(),
                "reason": other.failure_reason().map(|r| r.as_str()),
            }))
        }
    }
}

/// Text statistics of one digested page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingStats {
    pub total_chars: usize,
    pub total_words: usize,
    pub chunk_types: BTreeMap<String, usize>,
}

impl ProcessingStats {
    fn of(forest: &ChunkForest) -> Self {
        let mut stats = Self::default();
        for chunk in forest.iter() {
            stats.total_chars += chunk.char_count;
            stats.total_words += chunk.word_count;
            *stats
                .chunk_types
                .entry(chunk.chunk_type.as_str().to_string())
                .or_default() += 1;
        }
        stats
    }
}

/// Summary of one page in a digest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageDigest {
    pub url: String,
    pub depth: u32,
    pub title: String,
    /// "success", "skipped" or "error"
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    pub chunks_created: usize,
    pub hierarchical_chunks: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_stats: Option<ProcessingStats>,
    /// Set when the knowledge store rejected the page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learn_error: Option<String>,
}

impl PageDigest {
    fn bare(result: &CrawlResult, title: &str, status: &str) -> Self {
        Self {
            url: result.url.clone(),
            depth: result.depth,
            title: title.to_string(),
            status: status.to_string(),
            reason: None,
            platform: None,
            strategy: None,
            chunks_created: 0,
            hierarchical_chunks: 0,
            processing_stats: None,
            learn_error: None,
        }
    }
}

/// Chunks one crawled page and hands it to the knowledge store
///
/// Returns the page summary and the ids of the chunks it produced.
async fn digest_page(ctx: &JobContext, result: &CrawlResult) -> (PageDigest, Vec<String>) {
    let (content, title, metadata) = match ctx.parsers.find(&result.url) {
        Some(parser) => match parser.parse(&result.url, &result.content, &result.content_type) {
            Ok(parsed) => {
                let platform = parsed.platform().unwrap_or(parser.name()).to_string();
                let metadata = PlatformMetadata::new(platform)
                    .with_title(parsed.title.clone())
                    .with_tags(parsed.tags.clone());
                (parsed.content, parsed.title, metadata)
            }
            Err(e) => {
                warn!("Parser failed for {}: {}", result.url, e);
                let metadata = PlatformMetadata::default().with_title(result.title.clone());
                (result.content.clone(), result.title.clone(), metadata)
            }
        },
        None => {
            let metadata = PlatformMetadata::default().with_title(result.title.clone());
            (result.content.clone(), result.title.clone(), metadata)
        }
    };

    if strip_source_marker(&content).trim().chars().count() < MIN_DIGEST_CHARS {
        let mut page = PageDigest::bare(result, &title, "skipped");
        page.reason = Some("content_too_short".to_string());
        return (page, Vec::new());
    }

    let strategy = select_strategy(&content, metadata.platform.as_deref());
    let mut forest = ctx.engine.chunk(&content, &result.url, strategy);
    enrich(&mut forest, &metadata);

    let mut page = PageDigest::bare(result, &title, "success");
    page.platform = metadata.platform.clone();
    page.strategy = Some(strategy.to_string());
    page.chunks_created = forest.len();
    page.hierarchical_chunks = forest
        .iter()
        .filter(|c| c.parent_id.is_some() || !c.children.is_empty())
        .count();
    page.processing_stats = Some(ProcessingStats::of(&forest));

    let mut ids: Vec<String> = forest.ids().iter().map(ToString::to_string).collect();

    if let Some(knowledge) = &ctx.knowledge {
        match knowledge.learn(&result.url, forest).await {
            Ok(outcome) => {
                info!("Stored {} chunks from {}", outcome.chunks_created, result.url);
                ids = outcome.ids;
            }
            Err(e) => {
                warn!("Knowledge store failed for {}: {}", result.url, e);
                page.learn_error = Some(e.to_string());
            }
        }
    }

    (page, ids)
}

/// Crawls recursively from `url` and chunks every page
///
/// The data holds one [`PageDigest`] per attempted page; `ids` holds every
/// chunk id produced. Knowledge-store failures are reported per page.
#[instrument(skip(ctx))]
pub async fn digest_job(ctx: &JobContext, url: &str, max_depth: u32) -> JobResult {
    info!("Starting digest of {} with max depth {}", url, max_depth);

    let outcomes = match ctx.session().crawl_recursive(url, max_depth).await {
        Ok(outcomes) => outcomes,
        Err(e) => {
            warn!("Digest of {} failed: {}", url, e);
            return JobResult::error(e.to_string()).with_data(json!({
                "start_url": url,
                "max_depth": max_depth,
            }));
        }
    };

    let mut pages = Vec::with_capacity(outcomes.len());
    let mut ids = Vec::new();
    let mut strategies: BTreeMap<String, usize> = BTreeMap::new();

    for outcome in &outcomes {
        match outcome {
            CrawlOutcome::Success(result) => {
                let (page, page_ids) = digest_page(ctx, result).await;
                if let Some(strategy) = &page.strategy {
                    *strategies.entry(strategy.clone()).or_default() += 1;
                }
                ids.extend(page_ids);
                pages.push(page);
            }
            other => pages.push(PageDigest {
                url: other.url().to_string(),
                depth: 0,
                title: String::new(),
                status: other.status().to_string(),
                reason: other.reason(),
                platform: None,
                strategy: None,
                chunks_created: 0,
                hierarchical_chunks: 0,
                processing_stats: None,
                learn_error: None,
            }),
        }
    }

    let chunks_created: usize = pages.iter().map(|p| p.chunks_created).sum();
    let hierarchical_chunks: usize = pages.iter().map(|p| p.hierarchical_chunks).sum();
    let crawled = pages.iter().filter(|p| p.status == "success").count();

    info!(
        "Digest completed: {} pages, {} chunks",
        outcomes.len(),
        chunks_created
    );

    JobResult::success(json!({
        "start_url": url,
        "max_depth": max_depth,
        "total_pages": outcomes.len(),
        "digested_pages": crawled,
        "chunks_created": chunks_created,
        "hierarchical_chunks": hierarchical_chunks,
        "strategies_used": strategies,
        "cancelled": ctx.cancel.is_cancelled(),
        "crawl": CrawlSummary::from_outcomes(&outcomes),
        "pages": pages,
    }))
    .with_ids(ids)
}

/// Converts binary content through the processor registry and caches it
#[instrument(skip(ctx, content), fields(size = content.len()))]
pub async fn process_content_job(
    ctx: &JobContext,
    url: &str,
    content: &[u8],
    content_type: &str,
) -> JobResult {
    info!("Processing {} content from {}", content_type, url);

    let processed = match ctx.crawler.processors().process(content, content_type, url).await {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to process content from {}: {}", url, e);
            return JobResult::error(e.to_string());
        }
    };

    if let Err(e) = ctx.store.cache_content(
        url,
        &processed,
        "text/markdown",
        ctx.config.storage.content_ttl(),
    ) {
        warn!("Failed to cache processed content for {}: {}", url, e);
    }

    JobResult::success(json!({
        "url": url,
        "content_type": content_type,
        "processed_content": processed,
        "content_size": content.len(),
    }))
}

/// Drops expired frontier, robots and content records
#[instrument(skip(ctx))]
pub async fn cleanup_job(ctx: &JobContext) -> JobResult {
    info!("Starting cleanup of expired crawl data");

    let result = purge_and_report(ctx);

    match result {
        Ok(data) => {
            info!("Cleanup completed");
            JobResult::success(data)
        }
        Err(e) => {
            warn!("Cleanup failed: {}", e);
            JobResult::error(e.to_string())
        }
    }
}

fn purge_and_report(ctx: &JobContext) -> crate::Result<Value> {
    let queues = ctx.config.queues.names();
    let before = ctx.store.stats(&queues)?;
    let removed = ctx.store.purge_expired()?;
    let after = ctx.store.stats(&queues)?;
    Ok(json!({
        "removed": removed,
        "stats_before": before,
        "stats_after": after,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::JsonlKnowledgeStore;
    use crate::storage::MemoryStore;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn context(store: Arc<dyn FrontierStore>) -> JobContext {
        let mut config = Config::default();
        config.crawler.delay = 0.0;
        JobContext::new(config, store).unwrap()
    }

    async fn site(body: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/doc"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(body.to_string(), "text/html"),
            )
            .mount(&server)
            .await;
        server
    }

    const DOC: &str = "<html><head><title>Guide</title></head><body>\
        <h1>Install</h1><p>Run the installer and follow the prompts on screen carefully.</p>\
        <pre><code class=\"language-bash\">cargo install thing</code></pre>\
        <h2>Usage</h2><p>Call the binary with a path to your project directory.</p>\
        </body></html>";

    #[test]
    fn test_job_result_serializes_snake_case() {
        let value = serde_json::to_value(JobResult::error("boom")).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["error"], "boom");
        assert!(value.get("data").is_none());
    }

    #[tokio::test]
    async fn test_crawl_job_success_and_repeat() {
        let server = site(DOC).await;
        let ctx = context(Arc::new(MemoryStore::new()));
        let url = format!("{}/doc", server.uri());

        let first = crawl_job(&ctx, &url, 0).await;
        assert!(first.is_success());
        assert_eq!(first.data.as_ref().unwrap()["title"], "Guide");

        let second = crawl_job(&ctx, &url, 0).await;
        assert_eq!(second.status, JobStatus::Error);
        assert_eq!(second.data.unwrap()["reason"], "already_visited");
    }

    #[tokio::test]
    async fn test_digest_job_chunks_and_learns() {
        let server = site(DOC).await;
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("knowledge.jsonl");
        let ctx = context(Arc::new(MemoryStore::new()))
            .with_knowledge(Arc::new(JsonlKnowledgeStore::new(&out)));

        let result = digest_job(&ctx, &format!("{}/doc", server.uri()), 0).await;
        assert!(result.is_success());

        let data = result.data.unwrap();
        assert_eq!(data["total_pages"], 1);
        let page = &data["pages"][0];
        assert_eq!(page["status"], "success");
        assert!(page["chunks_created"].as_u64().unwrap() > 0);
        assert!(page["processing_stats"]["chunk_types"]["heading"].as_u64().unwrap() >= 2);

        let written = std::fs::read_to_string(&out).unwrap();
        assert_eq!(written.lines().count(), result.ids.len());
    }

    #[tokio::test]
    async fn test_digest_skips_short_content() {
        let server = site("<p>tiny</p>").await;
        let ctx = context(Arc::new(MemoryStore::new()));

        let result = digest_job(&ctx, &format!("{}/doc", server.uri()), 0).await;
        let data = result.data.unwrap();
        assert_eq!(data["pages"][0]["status"], "skipped");
        assert_eq!(data["pages"][0]["reason"], "content_too_short");
        assert!(result.ids.is_empty());
    }

    #[tokio::test]
    async fn test_process_content_job_caches() {
        let store = Arc::new(MemoryStore::new());
        let ctx = context(store.clone());

        let result =
            process_content_job(&ctx, "https://example.com/a.png", &[0u8; 8], "image/png").await;
        assert!(result.is_success());
        let cached = store
            .get_cached_content("https://example.com/a.png")
            .unwrap()
            .unwrap();
        assert_eq!(cached.content_type, "text/markdown");

        let unsupported =
            process_content_job(&ctx, "https://example.com/a.bin", &[1], "application/x-thing")
                .await;
        assert_eq!(unsupported.status, JobStatus::Error);
    }

    #[tokio::test]
    async fn test_cleanup_job_purges_expired() {
        let store = Arc::new(MemoryStore::with_url_ttl(Duration::ZERO));
        store.mark_visited("https://example.com/", 0, Some(200)).unwrap();
        let ctx = context(store);

        let result = cleanup_job(&ctx).await;
        assert!(result.is_success());
        let data = result.data.unwrap();
        assert_eq!(data["removed"], 1);
        assert_eq!(data["stats_after"]["crawled_urls"], 0);
    }
}
