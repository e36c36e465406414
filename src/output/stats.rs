//! Statistics generation from the results database
//!
//! This module provides functionality for extracting and displaying
//! scan statistics from the storage layer.

use crate::storage::{RunRecord, Storage};
use crate::SiteableError;
use std::collections::HashMap;

/// Stored scan statistics
#[derive(Debug, Clone)]
pub struct ScanStatistics {
    /// The run these figures describe; `None` aggregates every run
    pub run: Option<RunRecord>,

    /// Total number of stored page results
    pub total_pages: u64,

    /// Count of pages by fetch status
    pub pages_by_status: HashMap<String, u64>,

    /// Count of issues by code
    pub issues_by_code: HashMap<String, u64>,
}

impl ScanStatistics {
    pub fn total_issues(&self) -> u64 {
        self.issues_by_code.values().sum()
    }
}

/// Loads statistics for the latest run, or across all runs when the
/// database holds none
pub fn load_statistics(storage: &dyn Storage) -> Result<ScanStatistics, SiteableError> {
    let run = storage.get_latest_run()?;
    let run_id = run.as_ref().map(|r| r.id);

    Ok(ScanStatistics {
        total_pages: storage.count_total_pages(run_id)?,
        pages_by_status: storage.count_by_status(run_id)?,
        issues_by_code: storage.count_issues_by_code(run_id)?,
        run,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &ScanStatistics) {
    println!("=== Scan Statistics ===\n");

    if let Some(run) = &stats.run {
        println!("Run {} ({})", run.id, run.status.to_db_string());
        println!("  Started: {}", run.started_at);
        if let Some(finished) = &run.finished_at {
            println!("  Finished: {}", finished);
        }
        println!();
    }

    println!("Overview:");
    println!("  Total pages: {}", stats.total_pages);
    println!("  Total issues: {}", stats.total_issues());
    println!();

    println!("Pages by Status:");
    let mut status_counts: Vec<_> = stats.pages_by_status.iter().collect();
    status_counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

    for (status, count) in status_counts {
        let percentage = if stats.total_pages > 0 {
            (*count as f64 / stats.total_pages as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", status, count, percentage);
    }
    println!();

    if !stats.issues_by_code.is_empty() {
        println!("Issues by Code:");
        let mut issue_counts: Vec<_> = stats.issues_by_code.iter().collect();
        issue_counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        for (code, count) in issue_counts {
            println!("  {}: {}", code, count);
        }
        println!();
    }
}
