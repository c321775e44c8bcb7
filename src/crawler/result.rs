//! Page and crawl results

use crate::crawler::frontier::FrontierEntry;
use crate::extract::{FieldValue, ParsedPage, SelectorSet};
use crate::ErrorKind;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Outcome of visiting one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    pub url: String,

    /// Link distance from the seed
    #[serde(default)]
    pub depth: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,

    /// Field name to value, one key per selector rule
    pub extracted_fields: IndexMap<String, FieldValue>,

    pub discovered_links: Vec<String>,

    pub fetch_error: Option<ErrorKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// When the fetch finished
    #[serde(default = "Utc::now")]
    pub fetched_at: DateTime<Utc>,
}

impl PageResult {
    /// A page that was fetched and run through the selector engine
    pub fn extracted(entry: &FrontierEntry, status_code: Option<u16>, parsed: ParsedPage) -> Self {
        Self {
            url: entry.url.to_string(),
            depth: entry.depth,
            status_code,
            extracted_fields: parsed.fields,
            discovered_links: parsed.links,
            fetch_error: None,
            error_message: None,
            fetched_at: Utc::now(),
        }
    }

    /// A page that could not be fetched or parsed
    pub fn failed(
        entry: &FrontierEntry,
        kind: ErrorKind,
        message: String,
        status_code: Option<u16>,
    ) -> Self {
        Self {
            url: entry.url.to_string(),
            depth: entry.depth,
            status_code,
            extracted_fields: IndexMap::new(),
            discovered_links: Vec::new(),
            fetch_error: Some(kind.as_page_error()),
            error_message: Some(message),
            fetched_at: Utc::now(),
        }
    }

    pub fn with_fetched_at(mut self, fetched_at: DateTime<Utc>) -> Self {
        self.fetched_at = fetched_at;
        self
    }

    /// Adds an empty value for every rule the page has no value for
    pub fn with_empty_fields(mut self, selectors: &SelectorSet) -> Self {
        for rule in selectors.iter() {
            self.extracted_fields
                .entry(rule.name.clone())
                .or_insert_with(FieldValue::empty);
        }
        self
    }

    pub fn is_error(&self) -> bool {
        self.fetch_error.is_some()
    }
}

/// Every page visited by a job, keyed by URL in visit order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrawlResult {
    pub pages: IndexMap<String, PageResult>,
    pub total_visited: usize,
    pub total_errors: usize,
    pub truncated: bool,

    /// Why a sitemap job found no pages to visit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sitemap_error: Option<ErrorKind>,
}

impl CrawlResult {
    /// Adds a visited page and updates the counters
    pub fn record(&mut self, page: PageResult) {
        self.total_visited += 1;
        if page.is_error() {
            self.total_errors += 1;
        }
        self.pages.insert(page.url.clone(), page);
    }

    /// The first page visited
    pub fn first_page(&self) -> Option<&PageResult> {
        self.pages.values().next()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}
