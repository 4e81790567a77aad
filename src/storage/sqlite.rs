//! SQLite capture store implementation

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{PageStore, StorageError, StorageResult};
use crate::storage::{
    JobErrorRecord, JobPatch, JobRecord, JobStatus, NewPage, PageRecord, PageStatus,
};
use crate::DriftnetError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

/// SQLite capture store
///
/// The connection is guarded by a mutex: workers issue short
/// transactions concurrently and SQLite serializes them for us.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens or creates a capture database at the given path
    pub fn new(path: &Path) -> Result<Self, DriftnetError> {
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

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, DriftnetError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn encode_urls(urls: &[String]) -> StorageResult<String> {
    serde_json::to_string(urls).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn decode_urls(json: &str) -> StorageResult<Vec<String>> {
    serde_json::from_str(json).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn row_to_job(row: &rusqlite::Row<'_>) -> rusqlite::Result<(JobRecord, String, String)> {
    let seed_json: String = row.get(1)?;
    let canonical_json: String = row.get(2)?;
    let status: String = row.get(3)?;
    let record = JobRecord {
        id: row.get(0)?,
        seed_urls: Vec::new(),
        canonical_seed_urls: Vec::new(),
        status: JobStatus::from_db_string(&status).unwrap_or(JobStatus::Failed),
        pages_found: row.get::<_, i64>(4)? as u64,
        pages_processed: row.get::<_, i64>(5)? as u64,
        pages_failed: row.get::<_, i64>(6)? as u64,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    };
    Ok((record, seed_json, canonical_json))
}

const JOB_COLUMNS: &str = "id, seed_urls, canonical_seed_urls, status, \
                           pages_found, pages_processed, pages_failed, created_at, updated_at";

const PAGE_COLUMNS: &str = "id, job_id, url, canonical_url, content, content_hash, \
                            html, markdown, metadata, status, extracted_at";

fn finish_job(parts: (JobRecord, String, String)) -> StorageResult<JobRecord> {
    let (mut record, seed_json, canonical_json) = parts;
    record.seed_urls = decode_urls(&seed_json)?;
    record.canonical_seed_urls = decode_urls(&canonical_json)?;
    Ok(record)
}

fn row_to_page(row: &rusqlite::Row<'_>) -> rusqlite::Result<PageRecord> {
    let metadata: Option<String> = row.get(8)?;
    let status: String = row.get(9)?;
    Ok(PageRecord {
        id: row.get(0)?,
        job_id: row.get(1)?,
        url: row.get(2)?,
        canonical_url: row.get(3)?,
        alternate_urls: Vec::new(),
        content: row.get(4)?,
        content_hash: row.get(5)?,
        html: row.get(6)?,
        markdown: row.get(7)?,
        metadata: metadata.and_then(|m| serde_json::from_str(&m).ok()),
        status: PageStatus::from_db_string(&status).unwrap_or(PageStatus::Failed),
        extracted_at: row.get(10)?,
    })
}

/// Fills in `alternate_urls` for a page: the primary URL first, then
/// every other URL folded into it
fn load_alternates(conn: &Connection, page: &mut PageRecord) -> StorageResult<()> {
    let mut stmt = conn.prepare("SELECT url FROM page_urls WHERE page_id = ?1 ORDER BY id")?;
    let urls = stmt
        .query_map(params![page.id], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;

    let mut alternates = vec![page.url.clone()];
    for url in urls {
        if url != page.url && url != page.canonical_url {
            alternates.push(url);
        }
    }
    page.alternate_urls = alternates;
    Ok(())
}

impl PageStore for SqliteStore {
    // ===== Job Management =====

    fn create_job(
        &self,
        seed_urls: &[String],
        canonical_seed_urls: &[String],
    ) -> StorageResult<JobRecord> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO jobs (seed_urls, canonical_seed_urls, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![
                encode_urls(seed_urls)?,
                encode_urls(canonical_seed_urls)?,
                JobStatus::Pending.to_db_string(),
                now
            ],
        )?;

        Ok(JobRecord {
            id: conn.last_insert_rowid(),
            seed_urls: seed_urls.to_vec(),
            canonical_seed_urls: canonical_seed_urls.to_vec(),
            status: JobStatus::Pending,
            pages_found: 0,
            pages_processed: 0,
            pages_failed: 0,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    fn get_job(&self, job_id: i64) -> StorageResult<Option<JobRecord>> {
        let conn = self.conn.lock().unwrap();
        let parts = conn
            .query_row(
                &format!("SELECT {} FROM jobs WHERE id = ?1", JOB_COLUMNS),
                params![job_id],
                row_to_job,
            )
            .optional()?;

        parts.map(finish_job).transpose()
    }

    fn latest_job(&self) -> StorageResult<Option<JobRecord>> {
        let conn = self.conn.lock().unwrap();
        let parts = conn
            .query_row(
                &format!("SELECT {} FROM jobs ORDER BY id DESC LIMIT 1", JOB_COLUMNS),
                [],
                row_to_job,
            )
            .optional()?;

        parts.map(finish_job).transpose()
    }

    fn update_job(&self, job_id: i64, patch: &JobPatch) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();

        let changed = conn.execute(
            "UPDATE jobs SET
                status = COALESCE(?1, status),
                pages_found = COALESCE(?2, pages_found),
                pages_processed = COALESCE(?3, pages_processed),
                pages_failed = COALESCE(?4, pages_failed),
                updated_at = ?5
             WHERE id = ?6",
            params![
                patch.status.map(|s| s.to_db_string()),
                patch.pages_found.map(|n| n as i64),
                patch.pages_processed.map(|n| n as i64),
                patch.pages_failed.map(|n| n as i64),
                now,
                job_id
            ],
        )?;

        if changed == 0 {
            return Err(StorageError::JobNotFound(job_id));
        }
        Ok(())
    }

    fn append_job_error(&self, job_id: i64, error: &JobErrorRecord) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO job_errors (job_id, url, canonical_url, message, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                job_id,
                error.url,
                error.canonical_url,
                error.message,
                error.timestamp
            ],
        )?;
        Ok(())
    }

    fn get_job_errors(&self, job_id: i64) -> StorageResult<Vec<JobErrorRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT url, canonical_url, message, created_at
             FROM job_errors WHERE job_id = ?1 ORDER BY id",
        )?;
        let errors = stmt
            .query_map(params![job_id], |row| {
                Ok(JobErrorRecord {
                    url: row.get(0)?,
                    canonical_url: row.get(1)?,
                    message: row.get(2)?,
                    timestamp: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(errors)
    }

    fn delete_job(&self, job_id: i64) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute("DELETE FROM jobs WHERE id = ?1", params![job_id])?;
        if changed == 0 {
            return Err(StorageError::JobNotFound(job_id));
        }
        Ok(())
    }

    // ===== Page Management =====

    fn get_page_by_canonical_url(&self, canonical_url: &str) -> StorageResult<Option<PageRecord>> {
        let conn = self.conn.lock().unwrap();
        let page = conn
            .query_row(
                &format!(
                    "SELECT {} FROM pages
                     WHERE id = (SELECT page_id FROM page_urls WHERE url = ?1
                                 ORDER BY page_id DESC LIMIT 1)",
                    PAGE_COLUMNS
                ),
                params![canonical_url],
                row_to_page,
            )
            .optional()?;

        match page {
            Some(mut page) => {
                load_alternates(&conn, &mut page)?;
                Ok(Some(page))
            }
            None => Ok(None),
        }
    }

    fn get_page_by_content_hash(
        &self,
        job_id: i64,
        content_hash: &str,
    ) -> StorageResult<Option<PageRecord>> {
        let conn = self.conn.lock().unwrap();
        let page = conn
            .query_row(
                &format!(
                    "SELECT {} FROM pages WHERE job_id = ?1 AND content_hash = ?2",
                    PAGE_COLUMNS
                ),
                params![job_id, content_hash],
                row_to_page,
            )
            .optional()?;

        match page {
            Some(mut page) => {
                load_alternates(&conn, &mut page)?;
                Ok(Some(page))
            }
            None => Ok(None),
        }
    }

    fn save_page(&self, page: NewPage) -> StorageResult<PageRecord> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        let metadata_json = page
            .metadata
            .as_ref()
            .map(|m| serde_json::to_string(m))
            .transpose()
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        conn.execute(
            "INSERT INTO pages
                (job_id, url, canonical_url, content, content_hash,
                 html, markdown, metadata, status, extracted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                page.job_id,
                page.url,
                page.canonical_url,
                page.content,
                page.content_hash,
                page.html,
                page.markdown,
                metadata_json,
                page.status.to_db_string(),
                now
            ],
        )?;
        let id = conn.last_insert_rowid();

        conn.execute(
            "INSERT OR IGNORE INTO page_urls (page_id, url) VALUES (?1, ?2)",
            params![id, page.canonical_url],
        )?;

        Ok(PageRecord {
            id,
            job_id: page.job_id,
            alternate_urls: vec![page.url.clone()],
            url: page.url,
            canonical_url: page.canonical_url,
            content: page.content,
            content_hash: page.content_hash,
            html: page.html,
            markdown: page.markdown,
            metadata: page.metadata,
            status: page.status,
            extracted_at: now,
        })
    }

    fn append_alternate_url(&self, page_id: i64, url: &str) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO page_urls (page_id, url) VALUES (?1, ?2)",
            params![page_id, url],
        )?;
        Ok(())
    }

    fn list_pages(&self, job_id: i64) -> StorageResult<Vec<PageRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM pages WHERE job_id = ?1 ORDER BY id",
            PAGE_COLUMNS
        ))?;
        let mut pages = stmt
            .query_map(params![job_id], row_to_page)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for page in &mut pages {
            load_alternates(&conn, page)?;
        }
        Ok(pages)
    }

    fn count_pages(&self, job_id: i64) -> StorageResult<u64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM pages WHERE job_id = ?1",
            params![job_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
