//! End-to-end digest tests: crawl, chunk, enrich, learn

use crawl_digest::capabilities::{CapabilityError, CapabilityResult, JsonlKnowledgeStore, KnowledgeStore, LearnOutcome};
use crawl_digest::chunking::{ChunkForest, ChunkType, ChunkingEngine, ChunkingStrategy};
use crawl_digest::config::Config;
use crawl_digest::jobs::{digest_job, JobContext, JobStatus};
use crawl_digest::storage::MemoryStore;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ARTICLE: &str = r#"<html><head><title>Widget Handbook</title></head><body>
<h1>Widgets</h1>
<p>Widgets turn configuration files into running services with very little ceremony.</p>
<h2>Install</h2>
<pre><code class="language-bash">cargo install widget</code></pre>
<h2>Options</h2>
<table>
  <tr><th>Flag</th><th>Meaning</th></tr>
  <tr><td>-v</td><td>verbose</td></tr>
</table>
<p>See the <a href="/faq">FAQ</a> for more.</p>
</body></html>"#;

const FAQ: &str = r#"<html><head><title>FAQ</title></head><body>
<h1>Frequently asked</h1>
<p>Widgets run anywhere a recent toolchain is available, including small boards.</p>
</body></html>"#;

async fn site() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    for (route, body) in [("/", ARTICLE), ("/faq", FAQ)] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(body, "text/html"),
            )
            .mount(&server)
            .await;
    }
    server
}

fn context() -> JobContext {
    let mut config = Config::default();
    config.crawler.delay = 0.0;
    JobContext::new(config, Arc::new(MemoryStore::new())).unwrap()
}

#[tokio::test]
async fn test_digest_writes_chunks_for_every_page() {
    let server = site().await;
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("chunks.jsonl");
    let ctx = context().with_knowledge(Arc::new(JsonlKnowledgeStore::new(&out)));

    let result = digest_job(&ctx, &format!("{}/", server.uri()), 1).await;
    assert_eq!(result.status, JobStatus::Success);

    let data = result.data.unwrap();
    assert_eq!(data["total_pages"], 2);
    assert_eq!(data["digested_pages"], 2);
    assert_eq!(data["crawl"]["succeeded"], 2);

    let lines: Vec<serde_json::Value> = std::fs::read_to_string(&out)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), result.ids.len());
    assert_eq!(lines.len() as u64, data["chunks_created"].as_u64().unwrap());

    let code = lines
        .iter()
        .find(|line| line["chunk"]["chunk_type"] == "code")
        .expect("code chunk stored");
    assert_eq!(code["chunk"]["language"], "bash");
    assert!(code["chunk"]["categories"]
        .as_array()
        .unwrap()
        .contains(&serde_json::json!("lang-bash")));
    assert!(code["chunk"]["tags"]
        .as_array()
        .unwrap()
        .contains(&serde_json::json!("platform:unknown")));

    assert!(lines.iter().any(|line| line["chunk"]["chunk_type"] == "table"));
}

#[tokio::test]
async fn test_digest_builds_heading_hierarchy() {
    let server = site().await;
    let ctx = context();

    let result = digest_job(&ctx, &format!("{}/", server.uri()), 0).await;
    let data = result.data.unwrap();
    let page = &data["pages"][0];

    assert_eq!(page["title"], "Widget Handbook");
    assert_eq!(page["strategy"], "hybrid");
    assert!(page["hierarchical_chunks"].as_u64().unwrap() > 0);
    assert_eq!(page["processing_stats"]["chunk_types"]["heading"], 3);
}

struct BrokenStore;

#[async_trait::async_trait]
impl KnowledgeStore for BrokenStore {
    async fn learn(&self, _source: &str, _forest: ChunkForest) -> CapabilityResult<LearnOutcome> {
        Err(CapabilityError::Knowledge("store offline".to_string()))
    }
}

#[tokio::test]
async fn test_knowledge_store_failure_is_not_fatal() {
    let server = site().await;
    let ctx = context().with_knowledge(Arc::new(BrokenStore));

    let result = digest_job(&ctx, &format!("{}/", server.uri()), 0).await;
    assert_eq!(result.status, JobStatus::Success);

    let page = &result.data.as_ref().unwrap()["pages"][0];
    assert_eq!(page["status"], "success");
    assert!(page["learn_error"].as_str().unwrap().contains("store offline"));
    // Chunk ids are still reported from the local forest
    assert!(!result.ids.is_empty());
}

#[test]
fn test_hybrid_chunking_of_converted_page() {
    let markdown = crawl_digest::crawler::html_to_markdown(ARTICLE, "https://example.com/");
    let forest = ChunkingEngine::default().chunk(&markdown, "https://example.com/", ChunkingStrategy::Hybrid);

    assert!(forest.is_well_formed());
    let kinds: Vec<ChunkType> = forest.iter().map(|c| c.chunk_type).collect();
    assert!(kinds.contains(&ChunkType::Code));
    assert!(kinds.contains(&ChunkType::Table));

    let install = forest
        .iter()
        .find(|c| c.is_heading() && c.content == "Install")
        .unwrap();
    let children = forest.children_of(install.id);
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].chunk_type, ChunkType::Code);
}
