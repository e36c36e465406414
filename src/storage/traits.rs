//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::crawler::PageResult;
use crate::storage::{PageResultRecord, RunRecord, RunStatus};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// This is the write/read contract for scan results. A backend only has to
/// round-trip what is written here; its internal layout is its own business.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new scan run and returns its ID
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Updates the status of a run
    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Marks a run as completed with a finish timestamp
    fn complete_run(&mut self, run_id: i64) -> StorageResult<()>;

    // ===== Page Results =====

    /// Stores one page result; a second write for the same URL in the same
    /// run replaces the first
    fn save_page_result(&mut self, run_id: i64, site: &str, result: &PageResult) -> StorageResult<()>;

    /// Reads stored results, optionally restricted to one site
    fn get_page_results(&self, site: Option<&str>) -> StorageResult<Vec<PageResultRecord>>;

    /// Reads the results of a single run
    fn get_run_results(&self, run_id: i64) -> StorageResult<Vec<PageResultRecord>>;

    // ===== Statistics =====

    /// Number of stored results per fetch status, optionally for one run
    fn count_by_status(&self, run_id: Option<i64>) -> StorageResult<HashMap<String, u64>>;

    /// Number of issues per issue code, optionally for one run
    fn count_issues_by_code(&self, run_id: Option<i64>) -> StorageResult<HashMap<String, u64>>;

    /// Total stored results, optionally for one run
    fn count_total_pages(&self, run_id: Option<i64>) -> StorageResult<u64>;
}
