//! Storage traits and error types
//!
//! This module defines the persistence interface for finished jobs and the
//! associated error types.

use crate::crawler::CrawlResult;
use crate::job::CrawlJob;
use crate::state::CrawlState;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A finished job handed to the stores
#[derive(Debug, Clone, Copy)]
pub struct JobRecord<'a> {
    pub job_id: Uuid,
    pub job: &'a CrawlJob,
    pub state: CrawlState,
    pub result: &'a CrawlResult,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Durable storage for finished jobs
///
/// Implementations must be usable from several jobs at once.
pub trait ResultStore: Send + Sync {
    /// Writes a finished job and returns a handle the caller can use to
    /// retrieve it
    fn persist(&self, record: &JobRecord<'_>) -> StorageResult<String>;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}
