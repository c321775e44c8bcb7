//! Sumi-Glean: a selector-driven page harvester
//!
//! This crate fetches web pages (a single page, every page listed by a sitemap,
//! or a breadth-first crawl from a root URL), extracts named fields with CSS
//! selector rules and assembles a normalized result set.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod job;
pub mod sitemap;
pub mod state;
pub mod storage;
pub mod url;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error categories reported to callers
///
/// Only `ValidationError` and `FatalError` fail a job. The other kinds are
/// recorded on individual pages and counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Bad job parameters; the job never starts
    ValidationError,
    /// Network, timeout or HTTP status failure for one URL
    FetchError,
    /// Malformed HTML/XML for one URL or sitemap
    ParseError,
    /// The rendering fetcher exceeded its wait budget
    RenderTimeout,
    /// The job was terminated early
    FatalError,
}

impl ErrorKind {
    /// Returns the kind recorded on a page result
    ///
    /// Render timeouts are treated as ordinary fetch failures.
    pub fn as_page_error(self) -> Self {
        match self {
            Self::RenderTimeout => Self::FetchError,
            other => other,
        }
    }

    /// Parses the name produced by `Display`
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ValidationError" => Some(Self::ValidationError),
            "FetchError" => Some(Self::FetchError),
            "ParseError" => Some(Self::ParseError),
            "RenderTimeout" => Some(Self::RenderTimeout),
            "FatalError" => Some(Self::FatalError),
            _ => None,
        }
    }

    /// Returns true if this kind fails the whole job
    pub fn is_job_level(&self) -> bool {
        matches!(self, Self::ValidationError | Self::FatalError)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ValidationError => "ValidationError",
            Self::FetchError => "FetchError",
            Self::ParseError => "ParseError",
            Self::RenderTimeout => "RenderTimeout",
            Self::FatalError => "FatalError",
        };
        f.write_str(s)
    }
}

/// Main error type for Sumi-Glean operations
#[derive(Debug, Error)]
pub enum GleanError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid job: {0}")]
    Validation(String),

    #[error("Job aborted: {0}")]
    Fatal(String),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition {
        from: state::CrawlState,
        to: state::CrawlState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GleanError {
    /// Maps the error onto the reported error taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::Url(_) => ErrorKind::ValidationError,
            Self::Fetch(e) => e.kind(),
            _ => ErrorKind::FatalError,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for Sumi-Glean operations
pub type Result<T> = std::result::Result<T, GleanError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlResult, PageResult};
pub use job::{CrawlJob, Envelope, JobController, JobMode, JobRequest};
pub use state::CrawlState;
pub use url::{extract_domain, normalize_url};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_timeout_recorded_as_fetch_error() {
        assert_eq!(
            ErrorKind::RenderTimeout.as_page_error(),
            ErrorKind::FetchError
        );
        assert_eq!(ErrorKind::ParseError.as_page_error(), ErrorKind::ParseError);
    }

    #[test]
    fn test_job_level_kinds() {
        assert!(ErrorKind::ValidationError.is_job_level());
        assert!(ErrorKind::FatalError.is_job_level());
        assert!(!ErrorKind::FetchError.is_job_level());
        assert!(!ErrorKind::ParseError.is_job_level());
    }

    #[test]
    fn test_error_kind_serializes_as_name() {
        let json = serde_json::to_string(&ErrorKind::FetchError).unwrap();
        assert_eq!(json, "\"FetchError\"");
    }

    #[test]
    fn test_error_kind_name_roundtrip() {
        assert_eq!(
            ErrorKind::from_name(&ErrorKind::ParseError.to_string()),
            Some(ErrorKind::ParseError)
        );
        assert_eq!(ErrorKind::from_name("Nope"), None);
    }

    #[test]
    fn test_glean_error_kind() {
        assert_eq!(
            GleanError::Validation("bad".into()).kind(),
            ErrorKind::ValidationError
        );
        assert_eq!(
            GleanError::Fatal("stop".into()).kind(),
            ErrorKind::FatalError
        );
    }
}
