//! End-to-end jobs in every mode

use crate::{mount_html, mount_xml, run_job, test_config};
use serde_json::json;
use sumi_glean::ErrorKind;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn urlset(locations: &[String]) -> String {
    let entries: String = locations
        .iter()
        .map(|loc| format!("<url><loc>{}</loc></url>", loc))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</urlset>"#,
        entries
    )
}

#[tokio::test]
async fn test_single_page_http_500() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let envelope = run_job(
        test_config(dir.path()),
        json!({ "url": server.uri(), "selectors": { "title": "h1" } }),
    )
    .await;

    assert!(envelope.success);
    let page = envelope.data.as_ref().unwrap().as_page().unwrap();
    assert_eq!(page.fetch_error, Some(ErrorKind::FetchError));
    assert_eq!(page.status_code, Some(500));
    assert_eq!(page.extracted_fields.len(), 1);
    assert!(page.extracted_fields["title"].is_empty());
}

#[tokio::test]
async fn test_single_page_extracts_text_and_attributes() {
    let server = MockServer::start().await;
    mount_html(
        &server,
        "/article",
        r#"<html><body>
            <h1>  Release notes </h1>
            <img class="hero" src="/hero.png">
            <ul><li>one</li><li>two</li></ul>
            <a href="/next">next</a>
        </body></html>"#
            .to_string(),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let envelope = run_job(
        test_config(dir.path()),
        json!({
            "url": format!("{}/article", server.uri()),
            "selectors": {
                "title": "h1",
                "hero": "img.hero@src",
                "items": "li",
                "missing": "table"
            }
        }),
    )
    .await;

    assert!(envelope.success, "{}", envelope.message);
    let page = envelope.data.as_ref().unwrap().as_page().unwrap();
    assert_eq!(page.status_code, Some(200));
    assert_eq!(page.extracted_fields["title"].values(), vec!["Release notes"]);
    assert_eq!(page.extracted_fields["hero"].values(), vec!["/hero.png"]);
    assert_eq!(page.extracted_fields["items"].values(), vec!["one", "two"]);
    assert!(page.extracted_fields["missing"].is_empty());
    assert_eq!(
        page.discovered_links,
        vec![format!("{}/next", server.uri())]
    );
}

#[tokio::test]
async fn test_sitemap_urlset_of_three() {
    let server = MockServer::start().await;
    let base = server.uri();

    let pages: Vec<String> = (1..=3).map(|i| format!("{}/p{}", base, i)).collect();
    mount_xml(&server, "/sitemap.xml", urlset(&pages)).await;
    for i in 1..=3 {
        mount_html(
            &server,
            &format!("/p{}", i),
            format!("<html><body><h1>Page {}</h1></body></html>", i),
        )
        .await;
    }

    let dir = tempfile::tempdir().unwrap();
    let envelope = run_job(
        test_config(dir.path()),
        json!({
            "url": format!("{}/sitemap.xml", base),
            "mode": "sitemap",
            "selectors": { "title": "h1" }
        }),
    )
    .await;

    assert!(envelope.success, "{}", envelope.message);
    let result = envelope.data.as_ref().unwrap().as_crawl().unwrap();
    assert_eq!(result.total_visited, 3);
    assert_eq!(result.total_errors, 0);
    assert!(!result.truncated);

    let urls: Vec<&String> = result.pages.keys().collect();
    assert_eq!(urls, pages.iter().collect::<Vec<_>>());
    assert_eq!(
        result.pages[&pages[1]].extracted_fields["title"].values(),
        vec!["Page 2"]
    );
}

#[tokio::test]
async fn test_sitemap_index_expands_nested_sitemaps() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_xml(
        &server,
        "/sitemap_index.xml",
        format!(
            r#"<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
                <sitemap><loc>{0}/a.xml</loc></sitemap>
                <sitemap><loc>{0}/b.xml</loc></sitemap>
            </sitemapindex>"#,
            base
        ),
    )
    .await;
    mount_xml(&server, "/a.xml", urlset(&[format!("{}/one", base)])).await;
    mount_xml(&server, "/b.xml", urlset(&[format!("{}/two", base)])).await;
    mount_html(&server, "/one", "<p>1</p>".to_string()).await;
    mount_html(&server, "/two", "<p>2</p>".to_string()).await;

    let dir = tempfile::tempdir().unwrap();
    let envelope = run_job(
        test_config(dir.path()),
        json!({ "url": format!("{}/sitemap_index.xml", base), "mode": "sitemap" }),
    )
    .await;

    assert!(envelope.success, "{}", envelope.message);
    let result = envelope.data.as_ref().unwrap().as_crawl().unwrap();
    assert_eq!(result.total_visited, 2);
    assert!(result.pages.contains_key(&format!("{}/one", base)));
    assert!(result.pages.contains_key(&format!("{}/two", base)));
}

#[tokio::test]
async fn test_malformed_sitemap_yields_no_pages() {
    let server = MockServer::start().await;
    mount_xml(&server, "/sitemap.xml", "<urlset><url><loc>".to_string()).await;

    let dir = tempfile::tempdir().unwrap();
    let envelope = run_job(
        test_config(dir.path()),
        json!({ "url": format!("{}/sitemap.xml", server.uri()), "mode": "sitemap" }),
    )
    .await;

    assert!(envelope.success);
    assert!(envelope.message.contains("no pages found"));
    let result = envelope.data.as_ref().unwrap().as_crawl().unwrap();
    assert!(result.is_empty());
    assert_eq!(result.sitemap_error, Some(ErrorKind::ParseError));
}

#[tokio::test]
async fn test_crawl_truncates_at_page_budget() {
    let server = MockServer::start().await;
    let base = server.uri();

    let links: String = (1..=9)
        .map(|i| format!(r#"<a href="/p{}">p{}</a>"#, i, i))
        .collect();
    mount_html(&server, "/", format!("<html><body>{}</body></html>", links)).await;
    for i in 1..=9 {
        mount_html(
            &server,
            &format!("/p{}", i),
            format!("<html><body><h1>{}</h1></body></html>", i),
        )
        .await;
    }

    let dir = tempfile::tempdir().unwrap();
    let envelope = run_job(
        test_config(dir.path()),
        json!({ "url": base, "mode": "crawl", "max_pages": 5, "selectors": { "n": "h1" } }),
    )
    .await;

    assert!(envelope.success, "{}", envelope.message);
    let result = envelope.data.as_ref().unwrap().as_crawl().unwrap();
    assert_eq!(result.total_visited, 5);
    assert!(result.truncated);

    // Breadth-first: the root, then its first four links in document order
    let expected: Vec<String> = std::iter::once(format!("{}/", base))
        .chain((1..=4).map(|i| format!("{}/p{}", base, i)))
        .collect();
    let urls: Vec<String> = result.pages.keys().cloned().collect();
    assert_eq!(urls, expected);
    assert_eq!(result.pages[&expected[0]].depth, 0);
    assert_eq!(result.pages[&expected[4]].depth, 1);
}

#[tokio::test]
async fn test_crawl_fetches_links_as_written_with_delay() {
    let server = MockServer::start().await;
    mount_html(
        &server,
        "/",
        r#"<html><body><a href="/search?y=2&x=1">s</a></body></html>"#.to_string(),
    )
    .await;
    mount_html(&server, "/search", "<html><body><h1>S</h1></body></html>".to_string()).await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.crawl.workers = 1;
    config.crawl.request_delay_ms = 200;

    let started = std::time::Instant::now();
    let envelope = run_job(config, json!({ "url": server.uri(), "mode": "crawl" })).await;

    assert!(envelope.success, "{}", envelope.message);
    assert!(started.elapsed() >= std::time::Duration::from_millis(200));

    let requests = server.received_requests().await.unwrap();
    let search = requests
        .iter()
        .find(|r| r.url.path() == "/search")
        .expect("search page not fetched");
    assert_eq!(search.url.query(), Some("y=2&x=1"));

    let result = envelope.data.as_ref().unwrap().as_crawl().unwrap();
    let pages: Vec<_> = result.pages.values().collect();
    assert_eq!(pages.len(), 2);
    assert!(pages[1].fetched_at - pages[0].fetched_at >= chrono::Duration::milliseconds(200));
}

#[tokio::test]
async fn test_crawl_stays_on_root_host() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_html(
        &server,
        "/",
        r#"<a href="/local">local</a><a href="http://elsewhere.invalid/page">away</a>"#
            .to_string(),
    )
    .await;
    mount_html(&server, "/local", "<p>local</p>".to_string()).await;

    let dir = tempfile::tempdir().unwrap();
    let envelope = run_job(
        test_config(dir.path()),
        json!({ "url": base, "mode": "crawl", "max_pages": 10 }),
    )
    .await;

    assert!(envelope.success, "{}", envelope.message);
    let result = envelope.data.as_ref().unwrap().as_crawl().unwrap();
    assert_eq!(result.total_visited, 2);
    assert!(!result.truncated);
    assert!(!result
        .pages
        .keys()
        .any(|url| url.contains("elsewhere.invalid")));

    // Off-host links are still reported on the page that carried them
    let root = &result.pages[&format!("{}/", base)];
    assert!(root
        .discovered_links
        .contains(&"http://elsewhere.invalid/page".to_string()));
}

#[tokio::test]
async fn test_invalid_request_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let envelope = run_job(
        test_config(dir.path()),
        json!({ "url": "ftp://example.com/file", "max_pages": 5 }),
    )
    .await;

    assert!(!envelope.success);
    assert_eq!(envelope.error, Some(ErrorKind::ValidationError));
    assert!(envelope.data.is_none());
    assert!(envelope.job_id.is_none());
    assert!(!dir.path().join("downloads").exists());
}
