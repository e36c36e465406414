//! Result sinks
//!
//! A sink receives every terminal [`PageResult`] as soon as it is produced.
//! Sinks are shared by all workers, so implementations synchronize
//! internally. A failing sink is logged and skipped; it never stops a crawl.

use crate::crawler::PageResult;
use crate::storage::{SqliteStorage, Storage, StorageError};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Sink unavailable: {0}")]
    Unavailable(String),
}

/// Destination for page results
pub trait ResultSink: Send + Sync {
    fn emit(&self, url: &str, result: &PageResult) -> Result<(), SinkError>;
}

/// Collects results in memory, in emission order
#[derive(Debug, Default)]
pub struct MemorySink {
    results: Mutex<Vec<PageResult>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PageResult>> {
        self.results.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of everything emitted so far
    pub fn results(&self) -> Vec<PageResult> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResultSink for MemorySink {
    fn emit(&self, _url: &str, result: &PageResult) -> Result<(), SinkError> {
        self.lock().push(result.clone());
        Ok(())
    }
}

/// Writes each result to the `page_results` table of one run
pub struct SqliteSink {
    storage: Mutex<SqliteStorage>,
    run_id: i64,
    site: String,
}

impl SqliteSink {
    /// Wraps `storage`, recording results under `run_id` for `site`
    pub fn new(storage: SqliteStorage, run_id: i64, site: impl Into<String>) -> Self {
        Self {
            storage: Mutex::new(storage),
            run_id,
            site: site.into(),
        }
    }

    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    /// Gives the storage back, e.g. to close the run after the crawl
    pub fn into_storage(self) -> SqliteStorage {
        self.storage.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` against the underlying storage
    pub fn with_storage<T>(&self, f: impl FnOnce(&mut SqliteStorage) -> T) -> T {
        let mut storage = self.storage.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut storage)
    }
}

impl ResultSink for SqliteSink {
    fn emit(&self, _url: &str, result: &PageResult) -> Result<(), SinkError> {
        self.with_storage(|storage| storage.save_page_result(self.run_id, &self.site, result))?;
        Ok(())
    }
}

impl std::fmt::Debug for SqliteSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSink")
            .field("run_id", &self.run_id)
            .field("site", &self.site)
            .finish()
    }
}
