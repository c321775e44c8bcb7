//! Response envelope returned to callers

use crate::crawler::{CrawlResult, PageResult};
use crate::ErrorKind;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payload of an envelope
///
/// Sitemap and crawl jobs return the whole result; single-page jobs return
/// just the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvelopeData {
    Crawl(CrawlResult),
    Page(PageResult),
}

impl EnvelopeData {
    pub fn as_crawl(&self) -> Option<&CrawlResult> {
        match self {
            Self::Crawl(result) => Some(result),
            Self::Page(_) => None,
        }
    }

    pub fn as_page(&self) -> Option<&PageResult> {
        match self {
            Self::Page(page) => Some(page),
            Self::Crawl(_) => None,
        }
    }
}

/// Outcome of a job as seen by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    pub message: String,
    pub data: Option<EnvelopeData>,
    pub download_url: Option<String>,

    /// Set when the job failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<Uuid>,
}

impl Envelope {
    /// A job that never started
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            download_url: None,
            error: Some(ErrorKind::ValidationError),
            job_id: None,
        }
    }

    /// A job that started and was terminated early
    pub fn fatal(job_id: Uuid, message: impl Into<String>, data: Option<EnvelopeData>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data,
            download_url: None,
            error: Some(ErrorKind::FatalError),
            job_id: Some(job_id),
        }
    }

    /// A job that completed or was stopped
    pub fn succeeded(job_id: Uuid, message: impl Into<String>, data: Option<EnvelopeData>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
            download_url: None,
            error: None,
            job_id: Some(job_id),
        }
    }

    pub fn with_download_url(mut self, url: Option<String>) -> Self {
        self.download_url = url;
        self
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
