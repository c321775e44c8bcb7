//! Job controller - top-level entry point for running jobs
//!
//! Validates a request, picks the fetcher, prepares the frontier for the
//! job's mode, runs the coordinator and turns the outcome into an
//! `Envelope`. Finished jobs are handed to every configured store; the first
//! store's handle becomes the envelope's `download_url`.
//!
//! | Mode      | Seeds                     | Depth ceiling          | Links followed |
//! |-----------|---------------------------|------------------------|----------------|
//! | `single`  | root URL                  | 0                      | no             |
//! | `sitemap` | URLs listed by the sitemap| 0                      | no             |
//! | `crawl`   | root URL                  | job or `[crawl]` value | yes            |

use crate::config::Config;
use crate::crawler::{
    Coordinator, CrawlOutcome, CrawlResult, CrawlSettings, Fetcher, FrontierPolicy, HttpFetcher,
    ProgressEvent, RenderFetcher,
};
use crate::job::context::JobContext;
use crate::job::envelope::{Envelope, EnvelopeData};
use crate::job::request::{CrawlJob, JobMode, JobRequest};
use crate::sitemap::SitemapExpander;
use crate::state::CrawlState;
use crate::storage::{JobRecord, JsonFileStore, ResultStore, SqliteStore};
use crate::{ErrorKind, GleanError};
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

const SUCCESS_MESSAGE: &str = "Data scraped successfully";

/// Runs jobs against shared configuration, fetchers and stores
///
/// Jobs run through the same controller share nothing mutable; each gets
/// its own frontier, context and (when rendering) browser.
pub struct JobController {
    config: Arc<Config>,
    http: Arc<dyn Fetcher>,
    renderer: Option<Arc<dyn Fetcher>>,
    stores: Vec<Arc<dyn ResultStore>>,
}

/// Coordinator outcome plus notes gathered before the crawl started
struct JobReport {
    outcome: CrawlOutcome,
    notes: Vec<String>,
}

/// Seed URLs taken from a sitemap
#[derive(Default)]
struct SitemapSeeds {
    urls: Vec<String>,
    truncated: bool,
    error: Option<ErrorKind>,
}

impl SitemapSeeds {
    fn cut_short() -> Self {
        Self {
            truncated: true,
            ..Self::default()
        }
    }
}

impl JobController {
    /// Creates a controller with no stores
    pub fn new(config: Arc<Config>, http: Arc<dyn Fetcher>) -> Self {
        Self {
            config,
            http,
            renderer: None,
            stores: Vec::new(),
        }
    }

    /// Builds the HTTP fetcher and stores described by the configuration
    pub fn from_config(config: Config) -> Result<Self, GleanError> {
        let http: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(&config.fetch)?);
        let json_store = Arc::new(JsonFileStore::from_config(&config.output));

        let mut controller = Self::new(Arc::new(config), http).with_store(json_store);

        if let Some(path) = controller.config.output.database_path.clone() {
            let archive = SqliteStore::open(Path::new(&path))?;
            controller = controller.with_store(Arc::new(archive));
        }

        Ok(controller)
    }

    /// Uses a fixed fetcher for jobs with `use_renderer` instead of
    /// launching a browser per job
    pub fn with_renderer(mut self, renderer: Arc<dyn Fetcher>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn ResultStore>) -> Self {
        self.stores.push(store);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Creates a context for a new job, with the configured deadline and
    /// progress buffer
    pub fn new_context(&self) -> (JobContext, mpsc::Receiver<ProgressEvent>) {
        let (ctx, rx) = JobContext::new(self.config.crawl.progress_buffer);
        (self.apply_deadline(ctx), rx)
    }

    fn apply_deadline(&self, ctx: JobContext) -> JobContext {
        match (ctx.deadline, self.config.crawl.job_deadline_secs) {
            (None, secs) if secs > 0 => ctx.with_deadline(Duration::from_secs(secs)),
            _ => ctx,
        }
    }

    /// Validates and runs a request
    pub async fn submit(&self, request: &JobRequest, ctx: JobContext) -> Envelope {
        match request.validate() {
            Ok(job) => self.run(&job, ctx).await,
            Err(e) => {
                tracing::warn!("Rejected job for {}: {}", request.url, e);
                Envelope::rejected(e.to_string())
            }
        }
    }

    /// Runs a validated job to completion
    pub async fn run(&self, job: &CrawlJob, ctx: JobContext) -> Envelope {
        let ctx = self.apply_deadline(ctx);
        let job_id = ctx.id;
        let started_at = Utc::now();

        tracing::info!(
            "Job {}: {} {} (max {} pages, same domain only: {})",
            job_id,
            job.mode(),
            job.root_url(),
            job.max_pages(),
            job.same_domain_only()
        );

        let report = match self.execute(job, ctx).await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!("Job {} aborted: {}", job_id, e);
                return Envelope::fatal(job_id, e.to_string(), None);
            }
        };

        let JobReport { outcome, notes } = report;
        let CrawlOutcome {
            state,
            result,
            reason,
        } = outcome;

        let download_url = self.persist(job_id, job, state, &result, started_at).await;

        let mut message = match (state, reason) {
            (CrawlState::Failed, reason) => format!(
                "Job failed: {}",
                reason.unwrap_or_else(|| "unknown error".to_string())
            ),
            (CrawlState::Stopped, Some(reason)) => {
                format!("{} (stopped early: {})", SUCCESS_MESSAGE, reason)
            }
            _ => SUCCESS_MESSAGE.to_string(),
        };
        for note in notes {
            message.push_str("; ");
            message.push_str(&note);
        }
        if download_url.is_none() && !self.stores.is_empty() {
            message.push_str("; results were not saved");
        }

        let data = match job.mode() {
            JobMode::Single => result.first_page().cloned().map(EnvelopeData::Page),
            JobMode::Sitemap | JobMode::Crawl => Some(EnvelopeData::Crawl(result)),
        };

        let envelope = if state == CrawlState::Failed {
            Envelope::fatal(job_id, message, data)
        } else {
            Envelope::succeeded(job_id, message, data)
        };

        envelope.with_download_url(download_url)
    }

    async fn execute(&self, job: &CrawlJob, ctx: JobContext) -> Result<JobReport, GleanError> {
        let mut notes = Vec::new();

        let fetcher = self.fetcher_for(job).await?;

        let policy = FrontierPolicy {
            max_pages: job.max_pages(),
            max_depth: match job.mode() {
                JobMode::Crawl => job.max_depth().unwrap_or(self.config.crawl.max_depth),
                JobMode::Single | JobMode::Sitemap => 0,
            },
            same_domain_only: job.same_domain_only(),
        };

        let seeds = match job.mode() {
            JobMode::Single | JobMode::Crawl => SitemapSeeds {
                urls: vec![job.root_url().to_string()],
                ..SitemapSeeds::default()
            },
            JobMode::Sitemap => self.expand_sitemap(job, &ctx, &mut notes).await,
        };

        let mut coordinator = Coordinator::new(
            job.root_url(),
            policy,
            fetcher,
            job.selectors(),
            CrawlSettings::from(&self.config.crawl),
            ctx,
        )
        .follow_links(job.mode() == JobMode::Crawl);
        coordinator.seed(seeds.urls.iter().map(String::as_str));

        let mut outcome = coordinator.run().await?;
        outcome.result.truncated |= seeds.truncated;
        outcome.result.sitemap_error = seeds.error;

        Ok(JobReport { outcome, notes })
    }

    /// Picks the page fetcher for a job
    ///
    /// Rendering jobs use the configured renderer, or launch a browser that
    /// lives as long as the job.
    async fn fetcher_for(&self, job: &CrawlJob) -> Result<Arc<dyn Fetcher>, GleanError> {
        if !job.use_renderer() {
            return Ok(Arc::clone(&self.http));
        }
        if let Some(renderer) = &self.renderer {
            return Ok(Arc::clone(renderer));
        }

        let renderer = RenderFetcher::launch(&self.config.render, job.render_wait_ms())
            .await
            .map_err(|e| GleanError::Fatal(format!("renderer unavailable: {}", e)))?;
        Ok(Arc::new(renderer))
    }

    /// Expands the job's sitemap into seed URLs
    ///
    /// An unreadable sitemap yields no seeds and records its error kind; the
    /// job still completes. A stop or the deadline ends expansion with no
    /// seeds and a truncated result.
    async fn expand_sitemap(
        &self,
        job: &CrawlJob,
        ctx: &JobContext,
        notes: &mut Vec<String>,
    ) -> SitemapSeeds {
        let expander =
            SitemapExpander::new(Arc::clone(&self.http), self.config.crawl.sitemap_max_depth);

        let deadline = async {
            match ctx.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        let expansion = tokio::select! {
            expansion = expander.expand(job.root_url().as_str()) => expansion,
            _ = ctx.cancel.cancelled() => return SitemapSeeds::cut_short(),
            _ = deadline => {
                tracing::warn!("Job {} reached its deadline expanding {}", ctx.id, job.root_url());
                return SitemapSeeds::cut_short();
            }
        };

        match expansion {
            Ok(expansion) => {
                if expansion.truncated {
                    notes.push("sitemap recursion limit reached".to_string());
                }
                if !expansion.failures.is_empty() {
                    notes.push(format!(
                        "{} nested sitemap(s) could not be read",
                        expansion.failures.len()
                    ));
                }
                SitemapSeeds {
                    urls: expansion.urls,
                    truncated: expansion.truncated,
                    error: None,
                }
            }
            Err(e) => {
                tracing::warn!("Sitemap {} yielded no pages: {}", job.root_url(), e);
                notes.push(format!("no pages found: {}", e));
                SitemapSeeds {
                    error: Some(e.kind()),
                    ..SitemapSeeds::default()
                }
            }
        }
    }

    /// Hands a finished job to every store on the blocking pool
    ///
    /// Returns the first store's handle, if it succeeded.
    async fn persist(
        &self,
        job_id: Uuid,
        job: &CrawlJob,
        state: CrawlState,
        result: &CrawlResult,
        started_at: DateTime<Utc>,
    ) -> Option<String> {
        if self.stores.is_empty() {
            return None;
        }

        let stores = self.stores.clone();
        let job = job.clone();
        let result = result.clone();

        let saved = tokio::task::spawn_blocking(move || {
            save_to_stores(
                &stores,
                &JobRecord {
                    job_id,
                    job: &job,
                    state,
                    result: &result,
                    started_at,
                    finished_at: Utc::now(),
                },
            )
        })
        .await;

        match saved {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!("Persisting job {} did not finish: {}", job_id, e);
                None
            }
        }
    }
}

/// Writes a record to each store in order
///
/// Returns the first store's handle, if it succeeded.
fn save_to_stores(stores: &[Arc<dyn ResultStore>], record: &JobRecord<'_>) -> Option<String> {
    let mut handle = None;

    for (index, store) in stores.iter().enumerate() {
        match store.persist(record) {
            Ok(h) => {
                tracing::debug!("Job {} saved to {} as {}", record.job_id, store.name(), h);
                if index == 0 {
                    handle = Some(h);
                }
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to save job {} to {}: {}",
                    record.job_id,
                    store.name(),
                    e
                );
            }
        }
    }

    handle
}
