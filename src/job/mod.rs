//! Job controller
//!
//! Entry point for running jobs:
//! - `request`: caller-facing job requests and validation
//! - `context`: per-job cancellation, progress and deadline
//! - `controller`: mode dispatch, persistence and envelope assembly
//! - `envelope`: the response returned to callers

mod context;
mod controller;
mod envelope;
mod request;

pub use context::JobContext;
pub use controller::JobController;
pub use envelope::{Envelope, EnvelopeData};
pub use request::{CrawlJob, JobMode, JobRequest, MAX_MAX_PAGES, MIN_MAX_PAGES};
