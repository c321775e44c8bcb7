//! Fetcher capability and the plain HTTP implementation
//!
//! The crawl loop only sees the `Fetcher` trait. Two implementations exist:
//! `HttpFetcher` (this module) and `RenderFetcher` (headless browser).
//!
//! # Error Classification
//!
//! | Condition               | Result                   |
//! |-------------------------|--------------------------|
//! | Non-2xx HTTP status     | `FetchError::Status`     |
//! | Request timeout         | `FetchError::Timeout`    |
//! | Connection refused/DNS  | `FetchError::Connect`    |
//! | Body read failure       | `FetchError::Request`    |

use crate::config::FetchConfig;
use crate::ErrorKind;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// Failure to retrieve one URL
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Connection failed for {url}: {message}")]
    Connect { url: String, message: String },

    #[error("Request failed for {url}: {message}")]
    Request { url: String, message: String },

    #[error("Rendering {url} exceeded {budget_ms}ms")]
    RenderTimeout { url: String, budget_ms: u64 },

    #[error("Browser error for {url}: {message}")]
    Browser { url: String, message: String },

    #[error("Failed to start fetcher: {0}")]
    Setup(String),
}

impl FetchError {
    /// Maps the failure onto the reported error taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RenderTimeout { .. } => ErrorKind::RenderTimeout,
            Self::Setup(_) => ErrorKind::FatalError,
            _ => ErrorKind::FetchError,
        }
    }

    /// HTTP status code, when the failure came from one
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A successfully retrieved document
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: String,

    /// HTTP status code (unknown for rendered pages)
    pub status_code: Option<u16>,

    /// Content-Type header value
    pub content_type: Option<String>,

    /// Document body
    pub body: String,
}

impl FetchedPage {
    /// Returns true if the body can be treated as markup or text
    ///
    /// A missing Content-Type is given the benefit of the doubt.
    pub fn is_parseable(&self) -> bool {
        match &self.content_type {
            None => true,
            Some(ct) => {
                let ct = ct.to_ascii_lowercase();
                ct.contains("html") || ct.contains("xml") || ct.starts_with("text/")
            }
        }
    }
}

/// Retrieves documents for the crawl loop
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches one URL
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}

/// Builds an HTTP client with proper configuration
///
/// Redirects follow reqwest's default policy (at most 10 hops).
///
/// # Example
///
/// ```no_run
/// use sumi_glean::config::FetchConfig;
/// use sumi_glean::crawler::build_http_client;
///
/// let client = build_http_client(&FetchConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetchConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Plain HTTP GET fetcher
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = build_http_client(config).map_err(|e| FetchError::Setup(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wraps an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        let body = response.text().await.map_err(|e| classify_error(url, e))?;

        tracing::debug!("Fetched {} ({} bytes)", url, body.len());

        Ok(FetchedPage {
            final_url,
            status_code: Some(status.as_u16()),
            content_type,
            body,
        })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Classifies a reqwest error
fn classify_error(url: &str, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if e.is_connect() {
        FetchError::Connect {
            url: url.to_string(),
            message: e.to_string(),
        }
    } else {
        FetchError::Request {
            url: url.to_string(),
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(content_type: Option<&str>) -> FetchedPage {
        FetchedPage {
            final_url: "https://example.com/".to_string(),
            status_code: Some(200),
            content_type: content_type.map(|s| s.to_string()),
            body: String::new(),
        }
    }

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client(&FetchConfig::default()).is_ok());
    }

    #[test]
    fn test_http_fetcher_name() {
        let fetcher = HttpFetcher::new(&FetchConfig::default()).unwrap();
        assert_eq!(fetcher.name(), "http");
    }

    #[test]
    fn test_parseable_content_types() {
        assert!(page(Some("text/html; charset=utf-8")).is_parseable());
        assert!(page(Some("application/xhtml+xml")).is_parseable());
        assert!(page(Some("application/xml")).is_parseable());
        assert!(page(Some("text/plain")).is_parseable());
        assert!(page(None).is_parseable());
        assert!(!page(Some("application/pdf")).is_parseable());
        assert!(!page(Some("image/png")).is_parseable());
    }

    #[test]
    fn test_error_kinds() {
        let status = FetchError::Status {
            url: "u".into(),
            status: 500,
        };
        assert_eq!(status.kind(), ErrorKind::FetchError);
        assert_eq!(status.status_code(), Some(500));

        let render = FetchError::RenderTimeout {
            url: "u".into(),
            budget_ms: 10,
        };
        assert_eq!(render.kind(), ErrorKind::RenderTimeout);
        assert_eq!(render.kind().as_page_error(), ErrorKind::FetchError);
        assert_eq!(render.status_code(), None);
    }
}
