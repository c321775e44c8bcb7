//! Integration tests for Sumi-Glean
//!
//! These tests use wiremock to serve pages and sitemaps and run whole jobs
//! through the `JobController`.

mod job_tests;
mod storage_tests;

use std::path::Path;
use sumi_glean::config::Config;
use sumi_glean::job::{Envelope, JobController, JobRequest};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Configuration writing artifacts under `dir`
pub fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.output.download_dir = dir.join("downloads").to_string_lossy().into_owned();
    config.crawl.workers = 2;
    config.crawl.job_deadline_secs = 30;
    config.crawl.request_delay_ms = 0;
    config.fetch.timeout_secs = 5;
    config
}

/// Serves an HTML page at `route`
pub async fn mount_html(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

/// Serves an XML document at `route`
pub async fn mount_xml(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "application/xml"),
        )
        .mount(server)
        .await;
}

/// Runs a request through a controller built from `config`
pub async fn run_job(config: Config, request: serde_json::Value) -> Envelope {
    let controller = JobController::from_config(config).expect("Failed to build controller");
    let request: JobRequest = serde_json::from_value(request).expect("Invalid request");
    let (ctx, _progress) = controller.new_context();
    controller.submit(&request, ctx).await
}
