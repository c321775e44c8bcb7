//! SQLite job archive
//!
//! This module provides a SQLite-based implementation of the ResultStore
//! trait. Every finished job is written in one transaction and can be read
//! back as a `CrawlResult`.

use crate::crawler::{CrawlResult, PageResult};
use crate::job::JobMode;
use crate::state::CrawlState;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{JobRecord, ResultStore, StorageError, StorageResult};
use crate::ErrorKind;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Summary row of an archived job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredJob {
    pub id: String,
    pub root_url: String,
    pub mode: JobMode,
    pub state: CrawlState,
    pub total_visited: usize,
    pub total_errors: usize,
    pub truncated: bool,
    pub started_at: String,
    pub finished_at: String,
}

/// SQLite storage backend
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens or creates the archive at `path`
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        tracing::debug!("Opened job archive at {}", path.display());

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Writes a finished job, its pages, fields and links
    pub fn save_job(&self, record: &JobRecord<'_>) -> StorageResult<()> {
        let rules = serde_json::to_string(record.job.rules())?;
        let result = record.result;

        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO jobs (id, root_url, mode, max_pages, same_domain_only, use_renderer,
                               selectors, state, total_visited, total_errors, truncated,
                               started_at, finished_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                record.job_id.to_string(),
                record.job.root_url().as_str(),
                record.job.mode().as_str(),
                record.job.max_pages() as i64,
                record.job.same_domain_only(),
                record.job.use_renderer(),
                rules,
                record.state.to_db_string(),
                result.total_visited as i64,
                result.total_errors as i64,
                result.truncated,
                record.started_at.to_rfc3339(),
                record.finished_at.to_rfc3339(),
            ],
        )?;

        for (position, page) in result.pages.values().enumerate() {
            tx.execute(
                "INSERT INTO pages (job_id, position, url, depth, status_code, fetch_error,
                                    error_message, fetched_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.job_id.to_string(),
                    position as i64,
                    page.url,
                    page.depth,
                    page.status_code,
                    page.fetch_error.map(|k| k.to_string()),
                    page.error_message,
                    page.fetched_at.to_rfc3339(),
                ],
            )?;
            let page_id = tx.last_insert_rowid();

            for (position, (name, value)) in page.extracted_fields.iter().enumerate() {
                tx.execute(
                    "INSERT INTO fields (page_id, position, name, value) VALUES (?1, ?2, ?3, ?4)",
                    params![page_id, position as i64, name, serde_json::to_string(value)?],
                )?;
            }

            for (position, target) in page.discovered_links.iter().enumerate() {
                tx.execute(
                    "INSERT INTO links (page_id, position, target) VALUES (?1, ?2, ?3)",
                    params![page_id, position as i64, target],
                )?;
            }
        }

        tx.commit()?;

        tracing::debug!(
            "Archived job {} ({} pages)",
            record.job_id,
            result.pages.len()
        );

        Ok(())
    }

    /// Reads the summary row of a job
    pub fn load_job(&self, job_id: &str) -> StorageResult<StoredJob> {
        let conn = self.conn();
        let row = conn
            .query_row(
                "SELECT id, root_url, mode, state, total_visited, total_errors, truncated,
                        started_at, finished_at
                 FROM jobs WHERE id = ?1",
                params![job_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, i64>(5)?,
                        row.get::<_, bool>(6)?,
                        row.get::<_, String>(7)?,
                        row.get::<_, String>(8)?,
                    ))
                },
            )
            .optional()?
            .ok_or_else(|| StorageError::JobNotFound(job_id.to_string()))?;

        let (id, root_url, mode, state, visited, errors, truncated, started_at, finished_at) = row;

        Ok(StoredJob {
            id,
            root_url,
            mode: mode.parse().map_err(StorageError::Database)?,
            state: CrawlState::from_db_string(&state)
                .ok_or_else(|| StorageError::Database(format!("unknown job state '{}'", state)))?,
            total_visited: visited as usize,
            total_errors: errors as usize,
            truncated,
            started_at,
            finished_at,
        })
    }

    /// Reads an archived job back as a `CrawlResult`
    pub fn load_result(&self, job_id: &str) -> StorageResult<CrawlResult> {
        let job = self.load_job(job_id)?;
        let conn = self.conn();

        let mut pages_stmt = conn.prepare(
            "SELECT id, url, depth, status_code, fetch_error, error_message, fetched_at
             FROM pages WHERE job_id = ?1 ORDER BY position",
        )?;
        let mut fields_stmt =
            conn.prepare("SELECT name, value FROM fields WHERE page_id = ?1 ORDER BY position")?;
        let mut links_stmt =
            conn.prepare("SELECT target FROM links WHERE page_id = ?1 ORDER BY position")?;

        let rows = pages_stmt.query_map(params![job_id], |row| {
            let fetch_error: Option<String> = row.get(4)?;
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(6)?,
                PageResult {
                    url: row.get(1)?,
                    depth: row.get(2)?,
                    status_code: row.get(3)?,
                    extracted_fields: IndexMap::new(),
                    discovered_links: Vec::new(),
                    fetch_error: fetch_error.as_deref().and_then(ErrorKind::from_name),
                    error_message: row.get(5)?,
                    fetched_at: Utc::now(),
                },
            ))
        })?;

        let mut result = CrawlResult {
            total_visited: job.total_visited,
            total_errors: job.total_errors,
            truncated: job.truncated,
            ..CrawlResult::default()
        };

        for row in rows {
            let (page_id, fetched_at, mut page) = row?;
            page.fetched_at = DateTime::parse_from_rfc3339(&fetched_at)
                .map(|d| d.with_timezone(&Utc))
                .map_err(|e| StorageError::Database(e.to_string()))?;

            let fields = fields_stmt.query_map(params![page_id], |r| {
                Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
            })?;
            for field in fields {
                let (name, value) = field?;
                page.extracted_fields.insert(name, serde_json::from_str(&value)?);
            }

            page.discovered_links = links_stmt
                .query_map(params![page_id], |r| r.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;

            result.pages.insert(page.url.clone(), page);
        }

        Ok(result)
    }

    /// Most recently finished jobs, newest first
    pub fn recent_jobs(&self, limit: usize) -> StorageResult<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id FROM jobs ORDER BY finished_at DESC LIMIT ?1")?;
        let ids = stmt
            .query_map(params![limit as i64], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}

impl ResultStore for SqliteStore {
    fn persist(&self, record: &JobRecord<'_>) -> StorageResult<String> {
        self.save_job(record)?;
        Ok(record.job_id.to_string())
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}
