//! Headless browser fetcher
//!
//! Loads each URL in a fresh tab, waits for navigation, lets the page settle
//! for the job's render wait and reads back the DOM. The browser process is
//! launched once per fetcher and killed when the fetcher is dropped.

use crate::config::RenderConfig;
use crate::crawler::fetcher::{FetchError, FetchedPage, Fetcher};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Fetcher backed by a headless Chromium instance
pub struct RenderFetcher {
    browser: Browser,
    handler: JoinHandle<()>,
    page_timeout: Duration,
    settle: Duration,
}

impl RenderFetcher {
    /// Launches the browser
    ///
    /// `settle_ms` is the post-load wait applied to every page; it is added to
    /// the navigation budget, never counted against it.
    pub async fn launch(config: &RenderConfig, settle_ms: u64) -> Result<Self, FetchError> {
        let mut builder = BrowserConfig::builder();
        if config.no_sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(path) = &config.chrome_path {
            builder = builder.chrome_executable(path);
        }
        let browser_config = builder.build().map_err(FetchError::Setup)?;

        let (browser, mut events) = Browser::launch(browser_config)
            .await
            .map_err(|e| FetchError::Setup(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if let Err(e) = event {
                    tracing::debug!("Browser event loop ended: {}", e);
                    break;
                }
            }
        });

        tracing::info!("Headless browser launched");

        Ok(Self {
            browser,
            handler,
            page_timeout: Duration::from_secs(config.page_timeout_secs),
            settle: Duration::from_millis(settle_ms),
        })
    }

    /// Loads `url` in a new tab within the page budget
    ///
    /// The tab is closed whether the load succeeds, fails or runs out of time.
    async fn render(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let budget = self.page_timeout + self.settle;
        let deadline = Instant::now() + budget;

        let page = within(deadline, budget, url, async {
            self.browser
                .new_page(url)
                .await
                .map_err(|e| browser_error(url, e))
        })
        .await?;

        let load = async {
            page.wait_for_navigation()
                .await
                .map_err(|e| browser_error(url, e))?;

            if !self.settle.is_zero() {
                tokio::time::sleep(self.settle).await;
            }

            let body = page.content().await.map_err(|e| browser_error(url, e))?;
            let final_url = page
                .url()
                .await
                .ok()
                .flatten()
                .unwrap_or_else(|| url.to_string());

            Ok::<_, FetchError>(FetchedPage {
                final_url,
                status_code: None,
                content_type: Some("text/html".to_string()),
                body,
            })
        };
        let outcome = within(deadline, budget, url, load).await;

        if let Err(e) = page.close().await {
            tracing::debug!("Failed to close tab for {}: {}", url, e);
        }

        outcome
    }
}

#[async_trait]
impl Fetcher for RenderFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.render(url).await
    }

    fn name(&self) -> &'static str {
        "render"
    }
}

impl Drop for RenderFetcher {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

/// Runs a browser step, failing with `RenderTimeout` once `deadline` passes
async fn within<T, F>(
    deadline: Instant,
    budget: Duration,
    url: &str,
    step: F,
) -> Result<T, FetchError>
where
    F: Future<Output = Result<T, FetchError>>,
{
    match tokio::time::timeout_at(deadline, step).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::RenderTimeout {
            url: url.to_string(),
            budget_ms: budget.as_millis() as u64,
        }),
    }
}

fn browser_error(url: &str, e: impl std::fmt::Display) -> FetchError {
    FetchError::Browser {
        url: url.to_string(),
        message: e.to_string(),
    }
}
