//! Listing record store
//!
//! This module persists listings and the pipeline's audit trail:
//! - SQLite database initialization and versioned schema migrations
//! - Listing upserts keyed by the source identifier
//! - Execution run and step records written by the pipeline runner

mod schema;
mod sqlite;
mod traits;

pub use schema::{current_schema_version, latest_schema_version};
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::StepStatus;
use crate::CrawlError;
use chrono::{DateTime, Utc};
use std::path::Path;

/// Opens (creating if needed) the listing database at `path`
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file; its parent must exist
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Database with every migration applied
/// * `Err(CrawlError)` - Failed to open the database or migrate it
pub fn open_storage(path: &Path) -> Result<SqliteStorage, CrawlError> {
    SqliteStorage::new(path)
}

/// One pipeline invocation
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRun {
    pub id: i64,
    pub mode: String,
    pub status: StepStatus,
    pub items_processed: u64,
    pub items_created: u64,
    pub items_failed: u64,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ExecutionRun {
    /// Sets the final status and finish time
    pub fn finish(&mut self, status: StepStatus, error_message: Option<String>) {
        self.status = status;
        self.error_message = error_message;
        self.finished_at = Some(Utc::now());
    }
}

/// One step execution within a run
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    pub id: i64,
    pub run_id: i64,
    pub step_name: String,
    pub status: StepStatus,
    pub items_processed: u64,
    pub items_created: u64,
    pub items_failed: u64,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl StepRecord {
    /// Sets the final status and finish time
    pub fn finish(&mut self, status: StepStatus, error_message: Option<String>) {
        self.status = status;
        self.error_message = error_message;
        self.finished_at = Some(Utc::now());
    }
}
