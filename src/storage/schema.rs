//! Database schema definitions
//!
//! All SQL schema definitions for the driftnet capture database.

use rusqlite::Connection;

/// SQL schema for the capture database
pub const SCHEMA_SQL: &str = r#"
-- Crawl jobs
CREATE TABLE IF NOT EXISTS jobs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    seed_urls TEXT NOT NULL,
    canonical_seed_urls TEXT NOT NULL,
    status TEXT NOT NULL,
    pages_found INTEGER NOT NULL DEFAULT 0,
    pages_processed INTEGER NOT NULL DEFAULT 0,
    pages_failed INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Captured unique-content pages
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    job_id INTEGER NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
    url TEXT NOT NULL,
    canonical_url TEXT NOT NULL,
    content TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    html TEXT,
    markdown TEXT,
    metadata TEXT,
    status TEXT NOT NULL,
    extracted_at TEXT NOT NULL,
    UNIQUE(job_id, content_hash)
);

CREATE INDEX IF NOT EXISTS idx_pages_job ON pages(job_id);
CREATE INDEX IF NOT EXISTS idx_pages_canonical ON pages(canonical_url);

-- Every URL known to have produced a page's content (primary + folded)
CREATE TABLE IF NOT EXISTS page_urls (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page_id INTEGER NOT NULL REFERENCES pages(id) ON DELETE CASCADE,
    url TEXT NOT NULL,
    UNIQUE(page_id, url)
);

CREATE INDEX IF NOT EXISTS idx_page_urls_url ON page_urls(url);

-- Per-URL errors recorded against a job
CREATE TABLE IF NOT EXISTS job_errors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    job_id INTEGER NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
    url TEXT NOT NULL,
    canonical_url TEXT NOT NULL,
    message TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_job_errors_job ON job_errors(job_id);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}
