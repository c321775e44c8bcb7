//! Crawler module for page fetching and traversal
//!
//! This module contains the crawl engine, including:
//! - The `Fetcher` capability with HTTP and headless-browser implementations
//! - The URL frontier (queue, visited set, page budget)
//! - Progress reporting
//! - The coordinator that runs a job's traversal loop

mod coordinator;
mod fetcher;
mod frontier;
mod progress;
mod render;
mod result;

#[cfg(test)]
pub(crate) mod test_support;

pub use coordinator::{Coordinator, CrawlOutcome, CrawlSettings};
pub use fetcher::{build_http_client, FetchError, FetchedPage, Fetcher, HttpFetcher};
pub use frontier::{Frontier, FrontierEntry, FrontierPolicy, OfferOutcome};
pub use progress::{ProgressEvent, ProgressReporter};
pub use render::RenderFetcher;
pub use result::{CrawlResult, PageResult};
