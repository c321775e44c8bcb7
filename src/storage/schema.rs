//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the job archive.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per finished job
CREATE TABLE IF NOT EXISTS jobs (
    id TEXT PRIMARY KEY,
    root_url TEXT NOT NULL,
    mode TEXT NOT NULL,
    max_pages INTEGER NOT NULL,
    same_domain_only INTEGER NOT NULL,
    use_renderer INTEGER NOT NULL,
    selectors TEXT NOT NULL,
    state TEXT NOT NULL,
    total_visited INTEGER NOT NULL,
    total_errors INTEGER NOT NULL,
    truncated INTEGER NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT NOT NULL
);

-- Pages in visit order
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    job_id TEXT NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    url TEXT NOT NULL,
    depth INTEGER NOT NULL,
    status_code INTEGER,
    fetch_error TEXT,
    error_message TEXT,
    fetched_at TEXT NOT NULL,
    UNIQUE(job_id, url)
);

CREATE INDEX IF NOT EXISTS idx_pages_job ON pages(job_id, position);

-- Extracted fields; value is the JSON form (string or array)
CREATE TABLE IF NOT EXISTS fields (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page_id INTEGER NOT NULL REFERENCES pages(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    name TEXT NOT NULL,
    value TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_fields_page ON fields(page_id, position);

-- Discovered links in document order
CREATE TABLE IF NOT EXISTS links (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page_id INTEGER NOT NULL REFERENCES pages(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    target TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_links_page ON links(page_id, position);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
