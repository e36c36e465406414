//! Output module for scan reports
//!
//! This module handles:
//! - Summarizing a finished scan
//! - Rendering reports as plain text, JSON, markdown or HTML
//! - Reading aggregate statistics back out of the results database

mod html;
mod markdown;
pub mod stats;
mod summary;

pub use html::format_html_report;
pub use markdown::format_markdown_report;
pub use stats::{load_statistics, print_statistics, ScanStatistics};
pub use summary::ScanSummary;

use crate::config::OutputFormat;
use crate::crawler::{CrawlReport, PageResult};
use crate::severity::{self, Severity};
use crate::storage::StorageError;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Shape of the JSON report
#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    summary: ScanSummary,
    results: Vec<&'a PageResult>,
}

/// Renders a report in the requested format
pub fn render_report(report: &CrawlReport, format: OutputFormat) -> OutputResult<String> {
    match format {
        OutputFormat::Text => Ok(format_text_report(report)),
        OutputFormat::Json => {
            let json = JsonReport {
                summary: ScanSummary::from_report(report),
                results: report.sorted_results(),
            };
            Ok(serde_json::to_string_pretty(&json)?)
        }
        OutputFormat::Markdown => Ok(format_markdown_report(report)),
        OutputFormat::Html => Ok(format_html_report(report)),
    }
}

/// Writes a report to `path`, or to stdout when no path is given
pub fn write_report(
    report: &CrawlReport,
    format: OutputFormat,
    path: Option<&Path>,
) -> OutputResult<()> {
    let rendered = render_report(report, format)?;
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, rendered)?;
            tracing::info!("Report written to {}", path.display());
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

/// Formats a report as plain text for the terminal
pub fn format_text_report(report: &CrawlReport) -> String {
    let summary = ScanSummary::from_report(report);
    let mut out = String::new();

    let _ = writeln!(out, "=== SiteAble scan of {} ===", summary.start_url);
    if summary.cancelled {
        out.push_str("(scan cancelled, results are partial)\n");
    }
    let _ = writeln!(
        out,
        "{} pages ({} fetched) in {:.1}s, {} issues on {} pages",
        summary.total_pages,
        summary.pages_fetched,
        summary.elapsed_seconds,
        summary.total_issues,
        summary.pages_with_issues
    );
    if summary.total_issues > 0 {
        let counts = &summary.issues_by_severity;
        let levels: Vec<String> = Severity::ALL
            .iter()
            .filter(|level| counts.get(**level) > 0)
            .map(|level| format!("{} {}", counts.get(*level), level))
            .collect();
        let _ = writeln!(out, "By severity: {}", levels.join(", "));
    }
    out.push('\n');

    for result in report.sorted_results() {
        let _ = writeln!(out, "{} [{}]", result.url, result.fetch_status);
        for issue in severity::ranked(&result.issues) {
            let level = severity::severity_for(&issue.code);
            let _ = writeln!(out, "  - ({}) {}: {}", level, issue.code, issue.message);
        }
    }

    if !summary.issues_by_code.is_empty() {
        out.push_str("\nIssues by code:\n");
        for (code, count) in summary.top_issue_codes() {
            let _ = writeln!(out, "  {}: {}", code, count);
        }
    }

    out
}
