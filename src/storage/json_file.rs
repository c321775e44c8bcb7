//! Downloadable JSON artifacts
//!
//! Each finished job is written to `<download-dir>/scraped_data_<timestamp>_<job>.json`
//! with its pages nested under their URLs. The returned handle is the file's
//! download path (`<download-url-prefix>/<file name>`).

use crate::config::OutputConfig;
use crate::crawler::PageResult;
use crate::job::JobMode;
use crate::state::CrawlState;
use crate::storage::traits::{JobRecord, ResultStore, StorageResult};
use crate::ErrorKind;
use indexmap::IndexMap;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use uuid::Uuid;

/// Writes one JSON file per job
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
    url_prefix: String,
}

#[derive(Serialize)]
struct Artifact<'a> {
    job_id: Uuid,
    root_url: &'a str,
    mode: JobMode,
    state: CrawlState,
    finished_at: String,
    total_visited: usize,
    total_errors: usize,
    truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    sitemap_error: Option<ErrorKind>,
    pages: &'a IndexMap<String, PageResult>,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            url_prefix: url_prefix.into(),
        }
    }

    pub fn from_config(config: &OutputConfig) -> Self {
        Self::new(&config.download_dir, &config.download_url_prefix)
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    /// File name for a job's artifact
    pub fn file_name(record: &JobRecord<'_>) -> String {
        let job = record.job_id.simple().to_string();
        format!(
            "scraped_data_{}_{}.json",
            record.finished_at.format("%Y%m%d_%H%M%S"),
            &job[..8]
        )
    }
}

impl ResultStore for JsonFileStore {
    fn persist(&self, record: &JobRecord<'_>) -> StorageResult<String> {
        fs::create_dir_all(&self.dir)?;

        let artifact = Artifact {
            job_id: record.job_id,
            root_url: record.job.root_url().as_str(),
            mode: record.job.mode(),
            state: record.state,
            finished_at: record.finished_at.to_rfc3339(),
            total_visited: record.result.total_visited,
            total_errors: record.result.total_errors,
            truncated: record.result.truncated,
            sitemap_error: record.result.sitemap_error,
            pages: &record.result.pages,
        };

        let file_name = Self::file_name(record);
        let path = self.dir.join(&file_name);
        fs::write(&path, serde_json::to_string_pretty(&artifact)?)?;

        tracing::info!("Wrote {}", path.display());

        Ok(format!(
            "{}/{}",
            self.url_prefix.trim_end_matches('/'),
            file_name
        ))
    }

    fn name(&self) -> &'static str {
        "json-file"
    }
}
