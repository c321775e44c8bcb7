//! Crawl coordinator - main traversal loop
//!
//! Drives a job from `Idle` to a terminal state:
//! - Takes up to `workers` entries from the frontier per iteration
//! - Fetches them concurrently and waits for the whole batch
//! - Applies results in take order: selector engine, link offers, progress
//! - Checks the stop signal and deadline between iterations
//! - Waits `request_delay` before the next batch
//!
//! The frontier is owned by the coordinator and only touched between
//! fetches, so visit order for a given budget is reproducible.

use crate::config::CrawlConfig;
use crate::crawler::fetcher::{FetchError, FetchedPage, Fetcher};
use crate::crawler::frontier::{Frontier, FrontierEntry, FrontierPolicy, OfferOutcome};
use crate::crawler::progress::ProgressEvent;
use crate::crawler::result::{CrawlResult, PageResult};
use crate::extract::{parse_page, SelectorSet};
use crate::job::JobContext;
use crate::state::CrawlState;
use crate::{ErrorKind, GleanError};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use futures::FutureExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

type FetchOutcome = (Result<FetchedPage, FetchError>, DateTime<Utc>);

/// Loop tuning taken from `[crawl]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlSettings {
    /// Fetches in flight per iteration
    pub workers: usize,

    /// Consecutive fetch failures tolerated before the job fails (0 = unlimited)
    pub max_consecutive_failures: u32,

    /// Pause between batches
    pub request_delay: Duration,
}

impl From<&CrawlConfig> for CrawlSettings {
    fn from(config: &CrawlConfig) -> Self {
        Self {
            workers: config.workers.max(1) as usize,
            max_consecutive_failures: config.max_consecutive_failures,
            request_delay: Duration::from_millis(config.request_delay_ms),
        }
    }
}

/// How a crawl ended
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    /// Terminal state
    pub state: CrawlState,

    /// Pages gathered, possibly partial
    pub result: CrawlResult,

    /// Why the crawl ended early, if it did
    pub reason: Option<String>,
}

/// Main crawl loop for one job
pub struct Coordinator {
    fetcher: Arc<dyn Fetcher>,
    selectors: Arc<SelectorSet>,
    frontier: Frontier,
    follow_links: bool,
    settings: CrawlSettings,
    ctx: JobContext,
    state: CrawlState,
    result: CrawlResult,
    consecutive_failures: u32,
}

impl Coordinator {
    /// Creates a coordinator with an empty frontier scoped to `root`
    ///
    /// Discovered links are not followed until `follow_links(true)` is set.
    pub fn new(
        root: &Url,
        policy: FrontierPolicy,
        fetcher: Arc<dyn Fetcher>,
        selectors: Arc<SelectorSet>,
        settings: CrawlSettings,
        ctx: JobContext,
    ) -> Self {
        Self {
            fetcher,
            selectors,
            frontier: Frontier::new(root, policy),
            follow_links: false,
            settings,
            ctx,
            state: CrawlState::Idle,
            result: CrawlResult::default(),
            consecutive_failures: 0,
        }
    }

    /// Enables offering discovered links back to the frontier
    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    pub fn state(&self) -> CrawlState {
        self.state
    }

    /// Offers seed URLs at depth 0
    ///
    /// Returns the number accepted.
    pub fn seed<'a, I>(&mut self, urls: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut accepted = 0;
        for url in urls {
            match self.frontier.offer(url, 0, None) {
                OfferOutcome::Accepted => accepted += 1,
                outcome => tracing::debug!("Seed {} not queued: {:?}", url, outcome),
            }
        }
        accepted
    }

    /// Runs the crawl loop to a terminal state
    pub async fn run(mut self) -> Result<CrawlOutcome, GleanError> {
        self.transition(CrawlState::Running)?;

        tracing::info!(
            "Starting job {} with {} seed(s), {} worker(s) via {} fetcher",
            self.ctx.id,
            self.frontier.len(),
            self.settings.workers,
            self.fetcher.name()
        );
        let start_time = std::time::Instant::now();

        let reason = loop {
            if self.ctx.is_stopped() {
                tracing::info!("Stop requested, ending job {}", self.ctx.id);
                self.transition(CrawlState::Stopped)?;
                break Some("stop requested".to_string());
            }

            if self.ctx.deadline_passed() {
                tracing::warn!("Job {} reached its deadline", self.ctx.id);
                self.transition(CrawlState::Stopped)?;
                break Some("job deadline exceeded".to_string());
            }

            let batch = self.frontier.take_batch(self.settings.workers);
            if batch.is_empty() {
                tracing::info!("Frontier is empty, crawl complete");
                self.transition(CrawlState::Completed)?;
                break None;
            }

            let Some(fetched) = self.fetch_batch(&batch).await else {
                tracing::warn!(
                    "Job {} reached its deadline with {} fetch(es) in flight",
                    self.ctx.id,
                    batch.len()
                );
                self.transition(CrawlState::Stopped)?;
                break Some("job deadline exceeded".to_string());
            };

            for (entry, (outcome, fetched_at)) in batch.into_iter().zip(fetched) {
                self.apply(entry, outcome, fetched_at);
            }

            if self.failure_threshold_exceeded() {
                tracing::error!(
                    "Job {} failed after {} consecutive fetch failures",
                    self.ctx.id,
                    self.consecutive_failures
                );
                self.transition(CrawlState::Failed)?;
                break Some(format!(
                    "{} consecutive fetch failures",
                    self.consecutive_failures
                ));
            }

            if !self.frontier.is_empty() {
                self.pause().await;
            }
        };

        self.result.truncated = self.frontier.budget_exhausted()
            || matches!(self.state, CrawlState::Failed | CrawlState::Stopped);

        tracing::info!(
            "Job {} {}: {} pages visited, {} errors in {:?}",
            self.ctx.id,
            self.state,
            self.result.total_visited,
            self.result.total_errors,
            start_time.elapsed()
        );

        Ok(CrawlOutcome {
            state: self.state,
            result: self.result,
            reason,
        })
    }

    /// Fetches a batch concurrently, stamping each response with its arrival time
    ///
    /// Returns None if the job deadline passes first; outstanding fetches are
    /// dropped.
    async fn fetch_batch(&self, batch: &[FrontierEntry]) -> Option<Vec<FetchOutcome>> {
        let fetches = join_all(batch.iter().map(|entry| {
            self.fetcher
                .fetch(entry.target.as_str())
                .map(|outcome| (outcome, Utc::now()))
        }));

        match self.ctx.deadline {
            Some(deadline) => tokio::select! {
                results = fetches => Some(results),
                _ = tokio::time::sleep_until(deadline) => None,
            },
            None => Some(fetches.await),
        }
    }

    /// Sleeps for the request delay, cut short by a stop or the deadline
    async fn pause(&self) {
        let delay = self.settings.request_delay;
        if delay.is_zero() {
            return;
        }

        let mut until = Instant::now() + delay;
        if let Some(deadline) = self.ctx.deadline {
            until = until.min(deadline);
        }

        tokio::select! {
            _ = tokio::time::sleep_until(until) => {}
            _ = self.ctx.cancel.cancelled() => {}
        }
    }

    /// Records one fetch outcome and feeds discovered links to the frontier
    fn apply(
        &mut self,
        entry: FrontierEntry,
        outcome: Result<FetchedPage, FetchError>,
        fetched_at: DateTime<Utc>,
    ) {
        let page = match outcome {
            Ok(fetched) => {
                self.consecutive_failures = 0;
                self.extract(&entry, fetched)
            }
            Err(e) => {
                self.consecutive_failures += 1;
                tracing::warn!("{}", e);
                PageResult::failed(&entry, e.kind(), e.to_string(), e.status_code())
                    .with_empty_fields(&self.selectors)
            }
        }
        .with_fetched_at(fetched_at);

        if self.follow_links && !page.is_error() {
            for link in &page.discovered_links {
                let outcome = self
                    .frontier
                    .offer(link, entry.depth + 1, Some(entry.url.as_str()));
                tracing::trace!("Offered {}: {:?}", link, outcome);
            }
        }

        let url = page.url.clone();
        let failed = page.is_error();
        self.result.record(page);

        self.ctx.progress.report(ProgressEvent {
            job_id: self.ctx.id,
            visited: self.result.total_visited,
            max_pages: self.frontier.policy().max_pages,
            url,
            failed,
        });
    }

    /// Runs the selector engine over a fetched document
    fn extract(&self, entry: &FrontierEntry, fetched: FetchedPage) -> PageResult {
        if !fetched.is_parseable() {
            let content_type = fetched.content_type.unwrap_or_default();
            tracing::debug!("Skipping {} ({})", entry.url, content_type);
            return PageResult::failed(
                entry,
                ErrorKind::ParseError,
                format!("Unsupported content type: {}", content_type),
                fetched.status_code,
            )
            .with_empty_fields(&self.selectors);
        }

        let base = Url::parse(&fetched.final_url).unwrap_or_else(|_| entry.target.clone());
        let parsed = parse_page(&fetched.body, &base, &self.selectors);

        tracing::debug!(
            "Extracted {} field(s) and {} link(s) from {}",
            parsed.fields.len(),
            parsed.links.len(),
            entry.url
        );

        PageResult::extracted(entry, fetched.status_code, parsed)
    }

    fn failure_threshold_exceeded(&self) -> bool {
        self.settings.max_consecutive_failures > 0
            && self.consecutive_failures > self.settings.max_consecutive_failures
    }

    fn transition(&mut self, to: CrawlState) -> Result<(), GleanError> {
        if !self.state.can_transition_to(to) {
            return Err(GleanError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        tracing::debug!("Job {}: {} -> {}", self.ctx.id, self.state, to);
        self.state = to;
        Ok(())
    }
}
