//! Store trait and error types
//!
//! This module defines the trait interface for opportunity store backends and
//! associated error types.

use crate::pipeline::BatchSummary;
use crate::store::{
    BatchRunRecord, CandidateSelector, Opportunity, OpportunityStatus, OpportunityUpdate,
};
use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Opportunity not found: {0}")]
    OpportunityNotFound(i64),

    #[error("Batch run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for store operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for opportunity store implementations
///
/// Calls are short and synchronous; concurrent callers share one store
/// behind a mutex.
pub trait OpportunityStore: Send {
    // ===== Opportunities =====

    /// Enrolls a website, or returns the ID it already has
    ///
    /// New opportunities start as `discovered` with an empty contact record.
    ///
    /// # Arguments
    ///
    /// * `url` - The normalized homepage URL
    /// * `domain` - The host of `url`
    fn insert_opportunity(&mut self, url: &str, domain: &str) -> StorageResult<i64>;

    /// Gets an opportunity by ID
    fn get_opportunity(&self, id: i64) -> StorageResult<Opportunity>;

    /// Gets an opportunity by its exact URL
    fn find_by_url(&self, url: &str) -> StorageResult<Option<Opportunity>>;

    /// Opportunities matching the selector, oldest first, at most `limit`
    fn list_unprocessed(
        &self,
        selector: &CandidateSelector,
        limit: usize,
    ) -> StorageResult<Vec<Opportunity>>;

    /// Writes every field set in `update` in one statement
    ///
    /// `updated_at` is refreshed even when the update carries no field.
    fn update_opportunity(&mut self, id: i64, update: &OpportunityUpdate) -> StorageResult<()>;

    // ===== Statistics =====

    /// Counts opportunities in a status
    fn count_by_status(&self, status: OpportunityStatus) -> StorageResult<u64>;

    /// Counts all opportunities
    fn count_total(&self) -> StorageResult<u64>;

    /// Counts opportunities with a satisfied contact record
    fn count_with_contacts(&self) -> StorageResult<u64>;

    // ===== Batch runs =====

    /// Records the start of a batch
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Records the outcome of a batch
    fn complete_run(&mut self, run_id: i64, summary: &BatchSummary) -> StorageResult<()>;

    /// Records a batch in which every opportunity failed
    fn fail_run(&mut self, run_id: i64, summary: &BatchSummary) -> StorageResult<()>;

    /// Gets a batch run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<BatchRunRecord>;

    /// Most recent batch runs, newest first
    fn recent_runs(&self, limit: usize) -> StorageResult<Vec<BatchRunRecord>>;
}
