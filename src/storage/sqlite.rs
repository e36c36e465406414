//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::analyzer::Issue;
use crate::crawler::{FetchStatus, PageResult};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{PageResultRecord, RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;

const RESULT_COLUMNS: &str =
    "id, run_id, site, url, fetch_status, status_code, issues_json, discovered_count, ts";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens (creating if needed) the database at `path`
    pub fn new(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

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

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn query_results(
        &self,
        filter: &str,
        args: &[&dyn rusqlite::ToSql],
    ) -> StorageResult<Vec<PageResultRecord>> {
        let sql = format!(
            "SELECT {} FROM page_results {} ORDER BY run_id, url",
            RESULT_COLUMNS, filter
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(args, raw_result)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?.into_record()?);
        }
        Ok(records)
    }
}

/// A `page_results` row before its JSON column is decoded
struct RawResult {
    id: i64,
    run_id: i64,
    site: String,
    url: String,
    fetch_status: String,
    status_code: Option<u16>,
    issues_json: String,
    discovered_count: u32,
    ts: String,
}

fn raw_result(row: &Row<'_>) -> rusqlite::Result<RawResult> {
    Ok(RawResult {
        id: row.get(0)?,
        run_id: row.get(1)?,
        site: row.get(2)?,
        url: row.get(3)?,
        fetch_status: row.get(4)?,
        status_code: row.get(5)?,
        issues_json: row.get(6)?,
        discovered_count: row.get(7)?,
        ts: row.get(8)?,
    })
}

impl RawResult {
    fn into_record(self) -> StorageResult<PageResultRecord> {
        let fetch_status = FetchStatus::from_parts(&self.fetch_status, self.status_code)
            .ok_or_else(|| {
                StorageError::Database(format!("Unknown fetch status: {}", self.fetch_status))
            })?;
        let issues: Vec<Issue> = serde_json::from_str(&self.issues_json)?;

        Ok(PageResultRecord {
            id: self.id,
            run_id: self.run_id,
            site: self.site,
            url: self.url,
            fetch_status,
            issues,
            discovered_count: self.discovered_count,
            recorded_at: self.ts,
        })
    }
}

fn run_record(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?).unwrap_or(RunStatus::Failed),
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs WHERE id = ?1",
                params![run_id],
                run_record,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs ORDER BY id DESC LIMIT 1",
                [],
                run_record,
            )
            .optional()?;
        Ok(run)
    }

    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let finished_at = (status != RunStatus::Running).then_some(now);
        let changed = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = COALESCE(?2, finished_at) WHERE id = ?3",
            params![status.to_db_string(), finished_at, run_id],
        )?;
        if changed == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn complete_run(&mut self, run_id: i64) -> StorageResult<()> {
        self.update_run_status(run_id, RunStatus::Completed)
    }

    // ===== Page Results =====

    fn save_page_result(&mut self, run_id: i64, site: &str, result: &PageResult) -> StorageResult<()> {
        let issues_json = serde_json::to_string(&result.issues)?;
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT OR REPLACE INTO page_results
             (run_id, site, url, fetch_status, status_code, issues_json, issue_count, discovered_count, ts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                run_id,
                site,
                result.url,
                result.fetch_status.as_str(),
                result.fetch_status.status_code(),
                issues_json,
                result.issues.len() as i64,
                result.discovered_links.len() as i64,
                now
            ],
        )?;
        Ok(())
    }

    fn get_page_results(&self, site: Option<&str>) -> StorageResult<Vec<PageResultRecord>> {
        match site {
            Some(site) => self.query_results("WHERE site = ?1", &[&site]),
            None => self.query_results("", &[]),
        }
    }

    fn get_run_results(&self, run_id: i64) -> StorageResult<Vec<PageResultRecord>> {
        self.query_results("WHERE run_id = ?1", &[&run_id])
    }

    // ===== Statistics =====

    fn count_by_status(&self, run_id: Option<i64>) -> StorageResult<HashMap<String, u64>> {
        let mut stmt = self.conn.prepare(
            "SELECT fetch_status, COUNT(*) FROM page_results
             WHERE ?1 IS NULL OR run_id = ?1 GROUP BY fetch_status",
        )?;
        let rows = stmt.query_map(params![run_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts = HashMap::new();
        for row in rows {
            let (status, count) = row?;
            counts.insert(status, count as u64);
        }
        Ok(counts)
    }

    fn count_issues_by_code(&self, run_id: Option<i64>) -> StorageResult<HashMap<String, u64>> {
        let mut stmt = self.conn.prepare(
            "SELECT issues_json FROM page_results
             WHERE issue_count > 0 AND (?1 IS NULL OR run_id = ?1)",
        )?;
        let rows = stmt.query_map(params![run_id], |row| row.get::<_, String>(0))?;

        let mut counts = HashMap::new();
        for row in rows {
            let issues: Vec<Issue> = serde_json::from_str(&row?)?;
            for issue in issues {
                *counts.entry(issue.code).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    fn count_total_pages(&self, run_id: Option<i64>) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM page_results WHERE ?1 IS NULL OR run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
