//! Storage module for persisting crawl data
//!
//! This module owns the durable side of a crawl: job records with their
//! status and counters, captured pages keyed by content hash, alternate
//! URL lists for folded duplicates, and per-job error logs. The engine
//! only ever talks to the [`PageStore`] trait; the default backend is
//! SQLite.

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{PageStore, StorageError, StorageResult};

use std::path::Path;

use crate::DriftnetError;

/// Initializes or opens a capture database
pub fn open_store(path: &Path) -> Result<SqliteStore, DriftnetError> {
    SqliteStore::new(path)
}

/// Status of a crawl job
///
/// `Pending` and `InProgress` are active; everything else is terminal
/// and set exactly once by the completion routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Pending,
    InProgress,
    Completed,
    CompletedWithErrors,
    Interrupted,
    Failed,
}

impl JobStatus {
    /// Returns true if no further transitions are allowed
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::InProgress)
    }

    /// Converts to the database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::CompletedWithErrors => "completed_with_errors",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    /// Parses the database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "completed_with_errors" => Some(Self::CompletedWithErrors),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_db_string())
    }
}

/// Status of a captured page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageStatus {
    Success,
    Failed,
    Partial,
}

impl PageStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Partial => "partial",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            "partial" => Some(Self::Partial),
            _ => None,
        }
    }
}

/// One crawl run as stored durably
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub id: i64,
    pub seed_urls: Vec<String>,
    pub canonical_seed_urls: Vec<String>,
    pub status: JobStatus,
    pub pages_found: u64,
    pub pages_processed: u64,
    pub pages_failed: u64,
    pub created_at: String,
    pub updated_at: String,
}

/// One captured unique-content page
#[derive(Debug, Clone)]
pub struct PageRecord {
    pub id: i64,
    pub job_id: i64,
    /// First URL that produced this content
    pub url: String,
    pub canonical_url: String,
    /// All URLs that resolved to this content hash within the job;
    /// always non-empty, first element equals `url`
    pub alternate_urls: Vec<String>,
    pub content: String,
    pub content_hash: String,
    pub html: Option<String>,
    pub markdown: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub status: PageStatus,
    pub extracted_at: String,
}

/// Fields for inserting a new captured page
#[derive(Debug, Clone)]
pub struct NewPage {
    pub job_id: i64,
    pub url: String,
    pub canonical_url: String,
    pub content: String,
    pub content_hash: String,
    pub html: Option<String>,
    pub markdown: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub status: PageStatus,
}

/// One per-URL error recorded against a job
#[derive(Debug, Clone)]
pub struct JobErrorRecord {
    pub url: String,
    pub canonical_url: String,
    pub message: String,
    pub timestamp: String,
}

/// Partial update applied to a job record
///
/// `updated_at` is refreshed on every applied patch regardless of which
/// fields are set.
#[derive(Debug, Clone, Default)]
pub struct JobPatch {
    pub status: Option<JobStatus>,
    pub pages_found: Option<u64>,
    pub pages_processed: Option<u64>,
    pub pages_failed: Option<u64>,
}

impl JobPatch {
    /// Patch that only transitions status
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Patch that only refreshes the progress counters
    pub fn counters(found: u64, processed: u64, failed: u64) -> Self {
        Self {
            pages_found: Some(found),
            pages_processed: Some(processed),
            pages_failed: Some(failed),
            ..Default::default()
        }
    }
}
