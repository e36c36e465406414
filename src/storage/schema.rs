//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the SiteAble results
//! database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track scan runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- One row per URL that reached a terminal state in a run
CREATE TABLE IF NOT EXISTS page_results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    site TEXT NOT NULL,
    url TEXT NOT NULL,
    fetch_status TEXT NOT NULL,
    status_code INTEGER,
    issues_json TEXT NOT NULL,
    issue_count INTEGER NOT NULL DEFAULT 0,
    discovered_count INTEGER NOT NULL DEFAULT 0,
    ts TEXT NOT NULL,
    UNIQUE(run_id, url)
);

CREATE INDEX IF NOT EXISTS idx_page_results_site ON page_results(site);
CREATE INDEX IF NOT EXISTS idx_page_results_run ON page_results(run_id);
CREATE INDEX IF NOT EXISTS idx_page_results_status ON page_results(fetch_status);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.pragma_update(None, "user_version", get_schema_version())?;
    Ok(())
}

/// Gets the current schema version
///
/// Stored in `PRAGMA user_version` so a future layout change can detect
/// older databases.
pub fn get_schema_version() -> u32 {
    1
}
