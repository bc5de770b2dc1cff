//! Storage traits and error types

use crate::listing::{ContentHash, Listing};
use crate::state::ProcessingStatus;
use crate::storage::{ExecutionRun, StepRecord};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Step record not found: {0}")]
    StepNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON column error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Schema migration {version} failed: {source}")]
    Migration {
        version: u32,
        source: rusqlite::Error,
    },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Listing record store and run/step audit log
///
/// Every write is committed on its own; nothing spans a whole pipeline step.
pub trait Storage: Send {
    // ===== Listings =====

    /// Inserts or updates a listing keyed by `source_id`
    ///
    /// An existing row keeps its surrogate id and creation time; every other
    /// column takes the new values.
    ///
    /// # Arguments
    ///
    /// * `listing` - The listing to store; its `id` is ignored
    ///
    /// # Returns
    ///
    /// The stored listing with `id` populated
    fn upsert_listing(&mut self, listing: &Listing) -> StorageResult<Listing>;

    /// Inserts the listings whose `source_id` is not yet stored
    ///
    /// Known listings are untouched, whatever their status.
    ///
    /// # Arguments
    ///
    /// * `listings` - Discovered listings, possibly already known
    ///
    /// # Returns
    ///
    /// The number of newly created rows
    fn upsert_many(&mut self, listings: &[Listing]) -> StorageResult<usize>;

    /// Gets every listing in `status`, oldest first
    fn get_by_status(&self, status: ProcessingStatus) -> StorageResult<Vec<Listing>>;

    /// Looks a listing up by its natural key
    fn get_by_source_id(&self, source_id: &str) -> StorageResult<Option<Listing>>;

    /// Checks whether an `Enriched` listing already carries `hash`
    ///
    /// # Arguments
    ///
    /// * `hash` - Fingerprint of a raw detail payload
    fn exists_by_hash(&self, hash: &ContentHash) -> StorageResult<bool>;

    /// Shorthand for `get_by_status(Enriched)`
    fn get_enriched(&self) -> StorageResult<Vec<Listing>> {
        self.get_by_status(ProcessingStatus::Enriched)
    }

    /// Counts listings grouped by processing status
    fn count_by_status(&self) -> StorageResult<HashMap<ProcessingStatus, u64>>;

    /// Total number of stored listings
    fn count_listings(&self) -> StorageResult<u64>;

    // ===== Run audit =====

    /// Creates a new execution run in the `Running` state
    ///
    /// # Arguments
    ///
    /// * `mode` - Pipeline mode name, e.g. `full_crawl`
    ///
    /// # Returns
    ///
    /// The run with its id and start time populated
    fn create_run(&mut self, mode: &str) -> StorageResult<ExecutionRun>;

    /// Persists status, counters, error and finish time of a run
    fn update_run(&mut self, run: &ExecutionRun) -> StorageResult<()>;

    /// Gets a run by ID; a missing run is `StorageError::RunNotFound`
    fn get_run(&self, run_id: i64) -> StorageResult<ExecutionRun>;

    /// Most recently started run, if any
    fn get_latest_run(&self) -> StorageResult<Option<ExecutionRun>>;

    // ===== Step audit =====

    /// Creates a running step record under a run
    ///
    /// # Arguments
    ///
    /// * `run_id` - The owning execution run
    /// * `step_name` - Name of the step about to execute
    ///
    /// # Returns
    ///
    /// The step record with its id and start time populated
    fn create_step(&mut self, run_id: i64, step_name: &str) -> StorageResult<StepRecord>;

    /// Persists status, counters, error and finish time of a step
    fn update_step(&mut self, step: &StepRecord) -> StorageResult<()>;

    /// Step records of a run in execution order
    fn get_steps_for_run(&self, run_id: i64) -> StorageResult<Vec<StepRecord>>;
}
