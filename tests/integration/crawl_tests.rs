//! End-to-end traversal tests

use crawl_digest::config::{Config, StorageConfig};
use crawl_digest::crawler::{CrawlOutcome, CrawlSession, Crawler};
use crawl_digest::state::FailureReason;
use crawl_digest::storage::{FrontierStore, MemoryStore, SqliteStore};
use std::sync::Arc;
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with no politeness delay
fn create_test_config(max_depth: u32) -> Config {
    let mut config = Config::default();
    config.crawler.user_agent = "TestBot/1.0".to_string();
    config.crawler.delay = 0.0;
    config.crawler.max_depth = max_depth;
    config
}

fn crawler(store: Arc<dyn FrontierStore>, max_depth: u32) -> Crawler {
    Crawler::new(Arc::new(create_test_config(max_depth)), store).expect("client builds")
}

async fn mount_robots(server: &MockServer, status: u16, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(status).set_body_string(body.to_string()))
        .mount(server)
        .await;
}

async fn mount_html(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(body, "text/html"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_missing_robots_allows_crawl() {
    let server = MockServer::start().await;
    mount_robots(&server, 404, "").await;
    mount_html(
        &server,
        "/",
        "<html><head><title>Home</title></head><body><h1>Hi</h1></body></html>".to_string(),
    )
    .await;

    let crawler = crawler(Arc::new(MemoryStore::new()), 2);
    let outcome = crawler
        .crawl_url(&format!("{}/", server.uri()), 0)
        .await
        .unwrap();

    let result = outcome.into_result().expect("page should be crawled");
    assert_eq!(result.title, "Home");
    assert_eq!(result.content_type, "text/markdown");
    assert!(result.content.contains("# Hi"));
}

#[tokio::test]
async fn test_robots_server_error_blocks_page_fetch() {
    let server = MockServer::start().await;
    mount_robots(&server, 500, "").await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_string("never"))
        .expect(0)
        .mount(&server)
        .await;

    let crawler = crawler(Arc::new(MemoryStore::new()), 2);
    let outcome = crawler
        .crawl_url(&format!("{}/page", server.uri()), 0)
        .await
        .unwrap();

    assert_eq!(outcome.failure_reason(), Some(FailureReason::RobotsFetchError));
    assert_eq!(outcome.status(), "error");
}

#[tokio::test]
async fn test_disallowed_path_is_not_fetched() {
    let server = MockServer::start().await;
    mount_robots(&server, 200, "User-agent: *\nDisallow: /private").await;
    Mock::given(method("GET"))
        .and(path("/private/data"))
        .respond_with(ResponseTemplate::new(200).set_body_string("secret"))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let crawler = crawler(store.clone(), 2);
    let url = format!("{}/private/data", server.uri());

    let outcome = crawler.crawl_url(&url, 0).await.unwrap();
    assert_eq!(outcome.failure_reason(), Some(FailureReason::RobotsDisallowed));
    // The attempt is still recorded so it is not retried
    assert!(store.is_visited(&url).unwrap());
}

#[tokio::test]
async fn test_crawl_delay_is_honored() {
    let server = MockServer::start().await;
    mount_robots(&server, 200, "User-agent: *\nCrawl-delay: 1").await;
    mount_html(&server, "/slow", "<p>slow</p>".to_string()).await;

    let crawler = crawler(Arc::new(MemoryStore::new()), 2);
    let start = Instant::now();
    let outcome = crawler
        .crawl_url(&format!("{}/slow", server.uri()), 0)
        .await
        .unwrap();

    assert!(outcome.is_success());
    assert!(start.elapsed() >= Duration::from_millis(950));
}

#[tokio::test]
async fn test_recursive_crawl_respects_depth_bound() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_robots(&server, 404, "").await;
    for level in 0..5 {
        let route = if level == 0 {
            "/".to_string()
        } else {
            format!("/level{}", level)
        };
        mount_html(
            &server,
            &route,
            format!(r#"<a href="{}/level{}">deeper</a>"#, base, level + 1),
        )
        .await;
    }

    let session = CrawlSession::new(Arc::new(crawler(Arc::new(MemoryStore::new()), 5)));
    let outcomes = session
        .crawl_recursive(&format!("{}/", base), 1)
        .await
        .unwrap();

    let successes: Vec<_> = outcomes.iter().filter_map(CrawlOutcome::as_result).collect();
    assert_eq!(successes.len(), 2);
    assert!(successes.iter().all(|r| r.depth <= 1));
    assert!(!outcomes.iter().any(|o| o.url().ends_with("/level2")));
}

#[tokio::test]
async fn test_concurrent_workers_crawl_once() {
    let server = MockServer::start().await;
    mount_robots(&server, 404, "").await;
    Mock::given(method("GET"))
        .and(path("/shared"))
        .respond_with(ResponseTemplate::new(200).set_body_string("shared page"))
        .expect(1)
        .mount(&server)
        .await;

    let store: Arc<dyn FrontierStore> = Arc::new(MemoryStore::new());
    let url = format!("{}/shared", server.uri());

    let mut handles = Vec::new();
    for _ in 0..4 {
        let worker = crawler(Arc::clone(&store), 2);
        let url = url.clone();
        handles.push(tokio::spawn(async move { worker.crawl_url(&url, 0).await }));
    }

    let mut successes = 0;
    let mut already_visited = 0;
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            CrawlOutcome::Success(_) => successes += 1,
            CrawlOutcome::Skipped {
                reason: FailureReason::AlreadyVisited,
                ..
            } => already_visited += 1,
            other => panic!("unexpected outcome {:?}", other),
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(already_visited, 3);
}

#[tokio::test]
async fn test_fetch_failure_is_recorded_and_not_retried() {
    let server = MockServer::start().await;
    mount_robots(&server, 404, "").await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(410))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let crawler = crawler(store.clone(), 2);
    let url = format!("{}/gone", server.uri());

    let first = crawler.crawl_url(&url, 0).await.unwrap();
    assert_eq!(first.failure_reason(), Some(FailureReason::FetchError));
    assert_eq!(store.get_crawl_info(&url).unwrap().unwrap().status_code, Some(410));

    let second = crawler.crawl_url(&url, 0).await.unwrap();
    assert_eq!(second.failure_reason(), Some(FailureReason::AlreadyVisited));
}

#[tokio::test]
async fn test_json_content_passthrough() {
    let server = MockServer::start().await;
    mount_robots(&server, 404, "").await;
    Mock::given(method("GET"))
        .and(path("/api/data"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(r#"{"name": "crawl", "tags": ["a", "b"]}"#, "application/json"),
        )
        .mount(&server)
        .await;

    let crawler = crawler(Arc::new(MemoryStore::new()), 2);
    let result = crawler
        .crawl_url(&format!("{}/api/data", server.uri()), 0)
        .await
        .unwrap()
        .into_result()
        .unwrap();

    assert_eq!(result.content_type, "application/json");
    assert_eq!(result.title, "JSON from /api/data");
    let value: serde_json::Value = serde_json::from_str(&result.content).unwrap();
    assert_eq!(value["tags"][1], "b");
    assert!(result.links.is_empty());
}

#[tokio::test]
async fn test_sqlite_store_persists_across_reopen() {
    let server = MockServer::start().await;
    mount_robots(&server, 404, "").await;
    mount_html(
        &server,
        "/",
        format!(r#"<title>Root</title><a href="{}/child">child</a>"#, server.uri()),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("crawl.db");
    let storage = StorageConfig::default();
    let url = format!("{}/", server.uri());

    {
        let store = Arc::new(SqliteStore::open(&db_path, &storage, "default").unwrap());
        let crawler = crawler(store, 2);
        assert!(crawler.crawl_url(&url, 0).await.unwrap().is_success());
    }

    let store = SqliteStore::open(&db_path, &storage, "default").unwrap();
    assert!(store.is_visited(&url).unwrap());
    assert!(store.get_robots(&server.uri()).unwrap().is_some());
    assert_eq!(store.queue_size().unwrap(), 1);
    let cached = store.get_cached_content(&url).unwrap().unwrap();
    assert!(cached.content.contains("<!-- Source:"));
}

#[tokio::test]
async fn test_cancelled_session_stops_before_crawling() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let session = CrawlSession::new(Arc::new(crawler(Arc::new(MemoryStore::new()), 2)));
    session.cancel_token().cancel();

    let outcomes = session
        .crawl_recursive(&format!("{}/", server.uri()), 2)
        .await
        .unwrap();
    assert!(outcomes.is_empty());
}
