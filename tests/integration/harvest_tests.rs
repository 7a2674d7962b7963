//! Integration tests for the harvester
//!
//! These tests use wiremock to serve a small forum and run complete
//! harvests against it through the HTTP renderer backend.

use forum_harvest::config::{Config, NextPagePolicy, RendererBackend, StoreFormat};
use forum_harvest::storage::{JsonStore, SqliteStore, Storage};
use forum_harvest::{Coordinator, DiscoveryOutcome};
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, store_path: &Path, format: StoreFormat) -> Config {
    let mut config = Config::default();
    config.site.origin = base_url.to_string();
    config.site.start_url = format!("{}/list,1.html", base_url);
    config.crawler.max_workers = 3;
    config.crawler.listing_timeout_secs = 1;
    config.crawler.post_timeout_secs = 1;
    config.crawler.min_page_delay_ms = 0;
    config.crawler.max_page_delay_ms = 10;
    config.renderer.backend = RendererBackend::Http;
    config.renderer.user_agents = vec!["HarvestTest/1.0".to_string()];
    config.output.store_path = store_path.to_string_lossy().into_owned();
    config.output.format = format;
    config
}

fn listing_html(posts: &[u32], next_href: Option<&str>) -> String {
    let rows: String = posts
        .iter()
        .map(|id| {
            format!(
                r#"<tr class="listitem"><td class="title"><a href="/news,zssh000001,{}.html">post {}</a></td></tr>"#,
                id, id
            )
        })
        .collect();
    let next = next_href
        .map(|href| format!(r#"<a class="nextp" href="{}">下一页</a>"#, href))
        .unwrap_or_default();
    format!(
        r#"<html><body><div class="listbody"><table>{}</table></div>{}</body></html>"#,
        rows, next
    )
}

fn post_html(id: u32, body: &str, comments: &[(&str, &str)]) -> String {
    let comments: String = comments
        .iter()
        .map(|(time, text)| {
            format!(
                r#"<div class="l1items1"><span class="pubtime">{}</span><div class="short_text">{}</div></div>"#,
                time, text
            )
        })
        .collect();
    format!(
        r#"<html><body><div class="time">2024-03-0{} 09:30</div><div class="newstext">{}</div>{}</body></html>"#,
        id, body, comments
    )
}

async fn mount_page(server: &MockServer, page_path: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

/// Two listing pages, three posts: six keys (three bodies, three comments)
async fn mount_forum(server: &MockServer, next_href: &str) {
    mount_page(server, "/list,1.html", listing_html(&[1, 2], Some(next_href))).await;
    mount_page(server, "/list,2.html", listing_html(&[3], None)).await;
    mount_page(
        server,
        "/news,zssh000001,1.html",
        post_html(1, "今天大盘怎么走？", &[("03-01 09:41", "看涨"), ("03-01 09:45", "观望")]),
    )
    .await;
    mount_page(
        server,
        "/news,zssh000001,2.html",
        post_html(2, "second post", &[("03-02 10:00", "reply")]),
    )
    .await;
    mount_page(
        server,
        "/news,zssh000001,3.html",
        post_html(3, "third post", &[]),
    )
    .await;
}

#[tokio::test]
async fn test_full_harvest_into_json_store() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_forum(&mock_server, &format!("{}/list,2.html", base_url)).await;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store_path = temp_dir.path().join("posts.json");
    let config = create_test_config(&base_url, &store_path, StoreFormat::Json);

    let coordinator = Coordinator::from_config(config).expect("Failed to create coordinator");
    let summary = coordinator.run(5).await.expect("Harvest failed");

    assert_eq!(summary.pages_visited, 2);
    assert_eq!(summary.links_found, 3);
    assert_eq!(summary.outcome, DiscoveryOutcome::NoNextPage);
    assert_eq!(summary.fetch.attempted, 3);
    assert_eq!(summary.fetch.records, 3);
    assert_eq!(summary.fetch.merged, 3);
    assert_eq!(summary.store_entries, Some(6));

    let content = std::fs::read_to_string(&store_path).expect("Store file missing");
    assert!(content.contains("\"2024-03-01 09:30\": \"今天大盘怎么走？\""));
    assert!(content.starts_with("{\n    \""));

    let parsed: serde_json::Value = serde_json::from_str(&content).expect("Store is not JSON");
    assert_eq!(parsed["03-01 09:41"], "看涨");
    assert_eq!(parsed["2024-03-03 09:30"], "third post");
}

#[tokio::test]
async fn test_page_cap_limits_discovery() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_forum(&mock_server, &format!("{}/list,2.html", base_url)).await;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store_path = temp_dir.path().join("posts.json");
    let config = create_test_config(&base_url, &store_path, StoreFormat::Json);

    let coordinator = Coordinator::from_config(config).expect("Failed to create coordinator");
    let summary = coordinator.run(1).await.expect("Harvest failed");

    assert_eq!(summary.pages_visited, 1);
    assert_eq!(summary.links_found, 2);
    assert_eq!(summary.outcome, DiscoveryOutcome::Exhausted);
    assert_eq!(summary.fetch.records, 2);
}

#[tokio::test]
async fn test_second_run_merges_incrementally() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store_path = temp_dir.path().join("posts.json");

    let first_server = MockServer::start().await;
    let first_url = first_server.uri();
    mount_forum(&first_server, &format!("{}/list,2.html", first_url)).await;

    let config = create_test_config(&first_url, &store_path, StoreFormat::Json);
    Coordinator::from_config(config)
        .expect("Failed to create coordinator")
        .run(5)
        .await
        .expect("First harvest failed");

    // Same forum again: every key already exists
    let config = create_test_config(&first_url, &store_path, StoreFormat::Json);
    let summary = Coordinator::from_config(config)
        .expect("Failed to create coordinator")
        .run(5)
        .await
        .expect("Repeat harvest failed");
    assert_eq!(summary.fetch.entries_inserted, 0);
    assert_eq!(summary.fetch.entries_overwritten, 6);
    assert_eq!(summary.store_entries, Some(6));

    // A different board: one new post, one comment time colliding with the first run
    let second_server = MockServer::start().await;
    let second_url = second_server.uri();
    mount_page(&second_server, "/list,1.html", listing_html(&[9], None)).await;
    mount_page(
        &second_server,
        "/news,zssh000001,9.html",
        post_html(9, "new board", &[("03-01 09:41", "改看跌")]),
    )
    .await;

    let config = create_test_config(&second_url, &store_path, StoreFormat::Json);
    let summary = Coordinator::from_config(config)
        .expect("Failed to create coordinator")
        .run(5)
        .await
        .expect("Second harvest failed");
    assert_eq!(summary.fetch.entries_inserted, 1);
    assert_eq!(summary.fetch.entries_overwritten, 1);
    assert_eq!(summary.store_entries, Some(7));

    let entries = JsonStore::new(&store_path).load().expect("Failed to load store");
    assert_eq!(entries.len(), 7);
    assert!(entries.contains(&("03-01 09:41".to_string(), "改看跌".to_string())));
}

#[tokio::test]
async fn test_origin_prefixed_pagination() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_forum(&mock_server, "/list,2.html").await;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store_path = temp_dir.path().join("posts.json");

    let config = create_test_config(&base_url, &store_path, StoreFormat::Json);
    let summary = Coordinator::from_config(config)
        .expect("Failed to create coordinator")
        .run(5)
        .await
        .expect("Harvest failed");
    assert_eq!(summary.pages_visited, 1);
    assert_eq!(summary.outcome, DiscoveryOutcome::NoNextPage);

    let mut config = create_test_config(&base_url, &store_path, StoreFormat::Json);
    config.site.next_page = NextPagePolicy::OriginPrefixed;
    let summary = Coordinator::from_config(config)
        .expect("Failed to create coordinator")
        .run(5)
        .await
        .expect("Harvest failed");
    assert_eq!(summary.pages_visited, 2);
    assert_eq!(summary.links_found, 3);
}

#[tokio::test]
async fn test_sqlite_store_backend() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_forum(&mock_server, &format!("{}/list,2.html", base_url)).await;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store_path = temp_dir.path().join("posts.db");
    let config = create_test_config(&base_url, &store_path, StoreFormat::Sqlite);

    let summary = Coordinator::from_config(config)
        .expect("Failed to create coordinator")
        .run(5)
        .await
        .expect("Harvest failed");
    assert_eq!(summary.store_entries, Some(6));

    let store = SqliteStore::new(&store_path).expect("Failed to open store");
    let entries = store.load().expect("Failed to load store");
    assert_eq!(entries.len(), 6);
    assert!(entries.contains(&("03-02 10:00".to_string(), "reply".to_string())));
}

#[tokio::test]
async fn test_failing_post_is_contained() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/list,1.html", listing_html(&[1, 2, 3], None)).await;
    mount_page(
        &mock_server,
        "/news,zssh000001,1.html",
        post_html(1, "fine", &[]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/news,zssh000001,2.html"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;
    mount_page(
        &mock_server,
        "/news,zssh000001,3.html",
        "<html><body><p>帖子已删除</p></body></html>".to_string(),
    )
    .await;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store_path = temp_dir.path().join("posts.json");
    let config = create_test_config(&base_url, &store_path, StoreFormat::Json);

    let summary = Coordinator::from_config(config)
        .expect("Failed to create coordinator")
        .run(1)
        .await
        .expect("Harvest failed");

    assert_eq!(summary.fetch.attempted, 3);
    assert_eq!(summary.fetch.records, 1);
    assert_eq!(summary.fetch.failed, 1);
    assert_eq!(summary.fetch.skipped, 1);
    assert_eq!(summary.store_entries, Some(1));
}

#[tokio::test]
async fn test_unreachable_listing_yields_empty_harvest() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store_path = temp_dir.path().join("posts.json");
    let config = create_test_config(&base_url, &store_path, StoreFormat::Json);

    let summary = Coordinator::from_config(config)
        .expect("Failed to create coordinator")
        .run(3)
        .await
        .expect("Harvest failed");

    assert_eq!(summary.pages_visited, 0);
    assert_eq!(summary.outcome, DiscoveryOutcome::TimedOut);
    assert_eq!(summary.fetch.attempted, 0);
    assert_eq!(summary.store_entries, Some(0));
    assert!(!store_path.exists());
}
