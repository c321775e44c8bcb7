//! Progress reporting
//!
//! Progress events go out on a bounded channel with `try_send`. A slow or
//! absent consumer never holds up the crawl: when the channel is full the
//! event is dropped and counted.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

/// Emitted after every completed page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub job_id: Uuid,
    /// Pages completed so far
    pub visited: usize,
    /// Page budget of the job
    pub max_pages: usize,
    /// Page that just completed
    pub url: String,
    /// Whether that page recorded an error
    pub failed: bool,
}

/// Non-blocking sender side of a job's progress channel
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    tx: Option<mpsc::Sender<ProgressEvent>>,
    dropped: Arc<AtomicU64>,
}

impl ProgressReporter {
    /// Creates a reporter and the receiver its events arrive on
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let reporter = Self {
            tx: Some(tx),
            dropped: Arc::new(AtomicU64::new(0)),
        };
        (reporter, rx)
    }

    /// A reporter that discards every event
    pub fn disabled() -> Self {
        Self {
            tx: None,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Sends an event without waiting
    pub fn report(&self, event: ProgressEvent) {
        let Some(tx) = &self.tx else {
            return;
        };

        match tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::trace!("Progress channel full, dropped event for {}", event.url);
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }

    /// Number of events dropped because the channel was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
