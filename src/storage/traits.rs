//! Storage traits and error types

use crate::storage::{JobErrorRecord, JobPatch, JobRecord, NewPage, PageRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Job not found: {0}")]
    JobNotFound(i64),

    #[error("Page not found: {0}")]
    PageNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for capture store backends
///
/// Implementations must be safe to share across workers: methods take
/// `&self` and are called concurrently from the worker pool. Callers
/// must not assume ordering between concurrent `save_page` calls.
pub trait PageStore: Send + Sync {
    // ===== Job Management =====

    /// Creates a new job record in `pending` status
    fn create_job(
        &self,
        seed_urls: &[String],
        canonical_seed_urls: &[String],
    ) -> StorageResult<JobRecord>;

    /// Gets a job by ID
    fn get_job(&self, job_id: i64) -> StorageResult<Option<JobRecord>>;

    /// Gets the most recently created job
    fn latest_job(&self) -> StorageResult<Option<JobRecord>>;

    /// Applies a partial update to a job, refreshing `updated_at`
    fn update_job(&self, job_id: i64, patch: &JobPatch) -> StorageResult<()>;

    /// Appends a per-URL error to a job's error log
    fn append_job_error(&self, job_id: i64, error: &JobErrorRecord) -> StorageResult<()>;

    /// Returns a job's error log, oldest first
    fn get_job_errors(&self, job_id: i64) -> StorageResult<Vec<JobErrorRecord>>;

    /// Deletes a job and cascades to its pages and errors
    fn delete_job(&self, job_id: i64) -> StorageResult<()>;

    // ===== Page Management =====

    /// Looks up a captured page by canonical URL across all jobs
    ///
    /// Alternate URLs match too: a URL folded into another page's
    /// `alternate_urls` resolves to that page. The most recent capture
    /// wins.
    fn get_page_by_canonical_url(&self, canonical_url: &str) -> StorageResult<Option<PageRecord>>;

    /// Looks up a page by content hash within one job
    fn get_page_by_content_hash(
        &self,
        job_id: i64,
        content_hash: &str,
    ) -> StorageResult<Option<PageRecord>>;

    /// Persists a new captured page
    fn save_page(&self, page: NewPage) -> StorageResult<PageRecord>;

    /// Records an additional URL that produced an existing page's
    /// content; no-op if already present
    fn append_alternate_url(&self, page_id: i64, url: &str) -> StorageResult<()>;

    /// Lists all pages captured by a job, oldest first
    fn list_pages(&self, job_id: i64) -> StorageResult<Vec<PageRecord>>;

    /// Counts pages captured by a job
    fn count_pages(&self, job_id: i64) -> StorageResult<u64>;
}
