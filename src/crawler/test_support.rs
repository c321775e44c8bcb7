//! In-memory fetcher for unit tests

use crate::crawler::fetcher::{FetchError, FetchedPage, Fetcher};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

enum Response {
    Document { content_type: String, body: String },
    Status(u16),
}

/// A fixed set of URLs and their responses; unknown URLs return 404
pub(crate) struct MockSite {
    responses: HashMap<String, Response>,
    hits: Mutex<HashMap<String, usize>>,
    delay: Option<Duration>,
}

impl MockSite {
    pub(crate) fn new() -> Self {
        Self {
            responses: HashMap::new(),
            hits: Mutex::new(HashMap::new()),
            delay: None,
        }
    }

    pub(crate) fn html(self, url: &str, body: &str) -> Self {
        self.document(url, "text/html; charset=utf-8", body)
    }

    /// Adds an HTML page whose body is just links to `targets`
    pub(crate) fn links(self, url: &str, targets: &[&str]) -> Self {
        let anchors: String = targets
            .iter()
            .map(|t| format!(r#"<a href="{}">{}</a>"#, t, t))
            .collect();
        self.html(url, &format!("<html><body>{}</body></html>", anchors))
    }

    pub(crate) fn document(mut self, url: &str, content_type: &str, body: &str) -> Self {
        self.responses.insert(
            url.to_string(),
            Response::Document {
                content_type: content_type.to_string(),
                body: body.to_string(),
            },
        );
        self
    }

    pub(crate) fn status(mut self, url: &str, status: u16) -> Self {
        self.responses.insert(url.to_string(), Response::Status(status));
        self
    }

    pub(crate) fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub(crate) fn hits(&self, url: &str) -> usize {
        self.hits.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub(crate) fn total_hits(&self) -> usize {
        self.hits.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl Fetcher for MockSite {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        *self.hits.lock().unwrap().entry(url.to_string()).or_insert(0) += 1;

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.responses.get(url) {
            Some(Response::Document { content_type, body }) => Ok(FetchedPage {
                final_url: url.to_string(),
                status_code: Some(200),
                content_type: Some(content_type.clone()),
                body: body.clone(),
            }),
            Some(Response::Status(status)) => Err(FetchError::Status {
                url: url.to_string(),
                status: *status,
            }),
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
