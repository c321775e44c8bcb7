//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlState`: lifecycle of one crawl job (idle, running, and the three
//!   terminal outcomes)

mod crawl_state;

pub use crawl_state::CrawlState;
