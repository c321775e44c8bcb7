//! Job requests and validated jobs
//!
//! A `JobRequest` is what a caller sends (JSON/TOML job file or CLI flags).
//! `JobRequest::validate` turns it into an immutable `CrawlJob` or fails with
//! a validation error before any fetch happens.

use crate::extract::{rules_from_json, SelectorRule, SelectorSet};
use crate::url::normalize_url;
use crate::GleanError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use url::Url;

/// Smallest accepted page budget
pub const MIN_MAX_PAGES: i64 = 1;

/// Largest accepted page budget
pub const MAX_MAX_PAGES: i64 = 1000;

/// How a job traverses pages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobMode {
    /// Fetch the root URL only
    #[default]
    Single,
    /// Expand the root URL as a sitemap and visit every listed page
    Sitemap,
    /// Breadth-first crawl from the root URL
    Crawl,
}

impl JobMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Sitemap => "sitemap",
            Self::Crawl => "crawl",
        }
    }
}

impl fmt::Display for JobMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "single" => Ok(Self::Single),
            "sitemap" => Ok(Self::Sitemap),
            "crawl" => Ok(Self::Crawl),
            other => Err(format!(
                "unknown mode '{}' (expected single, sitemap or crawl)",
                other
            )),
        }
    }
}

fn default_max_pages() -> i64 {
    100
}

fn default_true() -> bool {
    true
}

/// A job as submitted by a caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRequest {
    pub url: String,

    #[serde(default)]
    pub mode: JobMode,

    /// Field name to rule mapping; null means no fields
    #[serde(default)]
    pub selectors: serde_json::Value,

    #[serde(default = "default_max_pages")]
    pub max_pages: i64,

    #[serde(default = "default_true")]
    pub same_domain_only: bool,

    #[serde(default)]
    pub use_renderer: bool,

    /// Post-load settle time for the rendering fetcher
    #[serde(default)]
    pub render_wait_ms: u64,

    /// Crawl depth ceiling; falls back to `[crawl] max-depth`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<u32>,
}

impl JobRequest {
    /// Creates a single-page request with default settings
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            mode: JobMode::default(),
            selectors: serde_json::Value::Null,
            max_pages: default_max_pages(),
            same_domain_only: true,
            use_renderer: false,
            render_wait_ms: 0,
            max_depth: None,
        }
    }

    /// Loads a request from a `.toml` or JSON file
    pub fn load(path: &Path) -> Result<Self, GleanError> {
        let content = std::fs::read_to_string(path)?;
        let is_toml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("toml"));

        if is_toml {
            toml::from_str(&content).map_err(|e| GleanError::Validation(e.to_string()))
        } else {
            serde_json::from_str(&content).map_err(|e| GleanError::Validation(e.to_string()))
        }
    }

    /// Validates the request into an immutable job
    ///
    /// # Errors
    ///
    /// Returns `GleanError::Validation` if the URL is not an absolute http(s)
    /// URL with a host, `max_pages` is outside [1, 1000], or the selectors are
    /// not a mapping of compilable rules.
    pub fn validate(&self) -> Result<CrawlJob, GleanError> {
        let root_url = normalize_url(self.url.trim())
            .map_err(|e| GleanError::Validation(format!("url '{}': {}", self.url, e)))?;

        if !(MIN_MAX_PAGES..=MAX_MAX_PAGES).contains(&self.max_pages) {
            return Err(GleanError::Validation(format!(
                "max_pages must be between {} and {}, got {}",
                MIN_MAX_PAGES, MAX_MAX_PAGES, self.max_pages
            )));
        }

        let rules = rules_from_json(&self.selectors)
            .map_err(|e| GleanError::Validation(e.to_string()))?;
        let selectors =
            SelectorSet::compile(&rules).map_err(|e| GleanError::Validation(e.to_string()))?;

        Ok(CrawlJob {
            root_url,
            mode: self.mode,
            rules,
            selectors: Arc::new(selectors),
            max_pages: self.max_pages as usize,
            same_domain_only: self.same_domain_only,
            use_renderer: self.use_renderer,
            render_wait_ms: self.render_wait_ms,
            max_depth: self.max_depth,
        })
    }
}

/// A validated job; immutable once built
#[derive(Debug, Clone)]
pub struct CrawlJob {
    root_url: Url,
    mode: JobMode,
    rules: IndexMap<String, SelectorRule>,
    selectors: Arc<SelectorSet>,
    max_pages: usize,
    same_domain_only: bool,
    use_renderer: bool,
    render_wait_ms: u64,
    max_depth: Option<u32>,
}

impl CrawlJob {
    /// Normalized root URL
    pub fn root_url(&self) -> &Url {
        &self.root_url
    }

    pub fn mode(&self) -> JobMode {
        self.mode
    }

    /// Rules as given, in request order
    pub fn rules(&self) -> &IndexMap<String, SelectorRule> {
        &self.rules
    }

    pub fn selectors(&self) -> Arc<SelectorSet> {
        Arc::clone(&self.selectors)
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    pub fn same_domain_only(&self) -> bool {
        self.same_domain_only
    }

    pub fn use_renderer(&self) -> bool {
        self.use_renderer
    }

    pub fn render_wait_ms(&self) -> u64 {
        self.render_wait_ms
    }

    pub fn max_depth(&self) -> Option<u32> {
        self.max_depth
    }
}
