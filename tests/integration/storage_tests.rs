//! Persistence of finished jobs

use crate::{mount_html, run_job, test_config};
use serde_json::json;
use std::path::Path;
use sumi_glean::storage::SqliteStore;
use sumi_glean::CrawlState;
use wiremock::MockServer;

async fn two_page_site() -> MockServer {
    let server = MockServer::start().await;
    mount_html(
        &server,
        "/",
        r#"<html><body><h1>Home</h1><a href="/about">about</a></body></html>"#.to_string(),
    )
    .await;
    mount_html(
        &server,
        "/about",
        "<html><body><h1>About</h1></body></html>".to_string(),
    )
    .await;
    server
}

#[tokio::test]
async fn test_json_artifact_is_downloadable() {
    let server = two_page_site().await;
    let dir = tempfile::tempdir().unwrap();

    let envelope = run_job(
        test_config(dir.path()),
        json!({ "url": server.uri(), "mode": "crawl", "selectors": { "title": "h1" } }),
    )
    .await;

    assert!(envelope.success, "{}", envelope.message);
    let download_url = envelope.download_url.expect("No download url");
    assert!(download_url.starts_with("/download/scraped_data_"));
    assert!(download_url.ends_with(".json"));

    let file_name = download_url.trim_start_matches("/download/");
    let written = std::fs::read_to_string(dir.path().join("downloads").join(file_name)).unwrap();
    let artifact: serde_json::Value = serde_json::from_str(&written).unwrap();

    assert_eq!(artifact["mode"], "crawl");
    assert_eq!(artifact["total_visited"], 2);
    let about = &artifact["pages"][format!("{}/about", server.uri())];
    assert_eq!(about["extracted_fields"]["title"], "About");
    assert_eq!(about["depth"], 1);
    assert!(about["fetched_at"].is_string());
}

#[tokio::test]
async fn test_sqlite_archive_reads_back() {
    let server = two_page_site().await;
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("glean.db");

    let mut config = test_config(dir.path());
    config.output.database_path = Some(db_path.to_string_lossy().into_owned());

    let envelope = run_job(
        config,
        json!({ "url": server.uri(), "mode": "crawl", "selectors": { "title": "h1" } }),
    )
    .await;

    assert!(envelope.success, "{}", envelope.message);
    let job_id = envelope.job_id.expect("No job id").to_string();
    let live = envelope.data.as_ref().unwrap().as_crawl().unwrap();

    let store = SqliteStore::open(Path::new(&db_path)).unwrap();
    let job = store.load_job(&job_id).unwrap();
    assert_eq!(job.state, CrawlState::Completed);
    assert_eq!(job.total_visited, 2);
    assert_eq!(job.root_url, format!("{}/", server.uri()));

    let archived = store.load_result(&job_id).unwrap();
    assert_eq!(
        archived.pages.keys().collect::<Vec<_>>(),
        live.pages.keys().collect::<Vec<_>>()
    );
    for (url, page) in &live.pages {
        let stored = &archived.pages[url];
        assert_eq!(stored.depth, page.depth);
        assert_eq!(stored.status_code, page.status_code);
        assert_eq!(stored.extracted_fields, page.extracted_fields);
        assert_eq!(stored.discovered_links, page.discovered_links);
        assert_eq!(stored.fetched_at, page.fetched_at);
    }
}
