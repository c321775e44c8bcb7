//! Storage module for persisting finished jobs
//!
//! This module handles everything written after a job ends:
//! - Downloadable JSON artifacts keyed by page URL
//! - An optional SQLite archive of jobs, pages, fields and links

mod json_file;
mod schema;
mod sqlite;
mod traits;

pub use json_file::JsonFileStore;
pub use sqlite::{SqliteStore, StoredJob};
pub use traits::{JobRecord, ResultStore, StorageError, StorageResult};
