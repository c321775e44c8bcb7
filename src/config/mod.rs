//! Configuration module for Sumi-Glean
//!
//! This module handles loading, parsing, and validating the TOML service
//! configuration. Every section is optional.
//!
//! # Example
//!
//! ```no_run
//! use sumi_glean::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("glean.toml")).unwrap();
//! println!("Fetch timeout: {}s", config.fetch.timeout_secs);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlConfig, FetchConfig, OutputConfig, RenderConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
