//! Per-job runtime context
//!
//! Everything a running job shares with the outside world lives here: its
//! id, the stop signal, the progress sender and the deadline. Nothing is
//! shared between jobs.

use crate::crawler::{ProgressEvent, ProgressReporter};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Handle to one job's cancellation, progress and deadline
#[derive(Debug, Clone)]
pub struct JobContext {
    pub id: Uuid,
    pub cancel: CancellationToken,
    pub progress: ProgressReporter,
    pub deadline: Option<Instant>,
}

impl JobContext {
    /// Creates a context with a progress channel of the given capacity
    pub fn new(progress_capacity: usize) -> (Self, mpsc::Receiver<ProgressEvent>) {
        let (progress, rx) = ProgressReporter::channel(progress_capacity);
        (Self::with_reporter(progress), rx)
    }

    /// Creates a context whose progress events are discarded
    pub fn detached() -> Self {
        Self::with_reporter(ProgressReporter::disabled())
    }

    fn with_reporter(progress: ProgressReporter) -> Self {
        Self {
            id: Uuid::new_v4(),
            cancel: CancellationToken::new(),
            progress,
            deadline: None,
        }
    }

    /// Sets the deadline to `limit` from now
    pub fn with_deadline(mut self, limit: Duration) -> Self {
        self.deadline = Some(Instant::now() + limit);
        self
    }

    /// Requests a cooperative stop
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn deadline_passed(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}
