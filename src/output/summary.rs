//! Scan summary types
//!
//! A [`ScanSummary`] condenses a [`CrawlReport`] into the counts every
//! report format prints.

use crate::crawler::{CrawlReport, FetchStatus, PageResult};
use crate::severity::{severity_for, SeverityCounts};
use serde::Serialize;
use std::collections::BTreeMap;

/// Aggregate view of one scan
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanSummary {
    pub start_url: String,

    /// Results recorded, one per URL
    pub total_pages: u64,

    /// Page fetches initiated
    pub pages_fetched: u64,

    pub pages_ok: u64,
    pub pages_http_error: u64,
    pub pages_timeout: u64,
    pub pages_network_error: u64,
    pub pages_robots_blocked: u64,
    pub pages_not_html: u64,

    pub total_issues: u64,

    /// Pages with at least one issue
    pub pages_with_issues: u64,

    /// Issue code -> occurrences
    pub issues_by_code: BTreeMap<String, u64>,

    pub issues_by_severity: SeverityCounts,

    /// Distinct links seen across all pages
    pub links_discovered: u64,

    pub cancelled: bool,
    pub elapsed_seconds: f64,
}

impl ScanSummary {
    /// Builds a summary from a finished report
    pub fn from_report(report: &CrawlReport) -> Self {
        let mut summary = Self {
            start_url: report.start_url.clone(),
            pages_fetched: report.pages_fetched as u64,
            cancelled: report.cancelled,
            elapsed_seconds: report.elapsed.as_secs_f64(),
            ..Self::default()
        };

        let mut links = std::collections::HashSet::new();
        for result in report.results.values() {
            summary.record(result);
            links.extend(result.discovered_links.iter().map(String::as_str));
        }
        summary.links_discovered = links.len() as u64;
        summary
    }

    fn record(&mut self, result: &PageResult) {
        self.total_pages += 1;
        match result.fetch_status {
            FetchStatus::Ok => self.pages_ok += 1,
            FetchStatus::HttpError(_) => self.pages_http_error += 1,
            FetchStatus::Timeout => self.pages_timeout += 1,
            FetchStatus::NetworkError => self.pages_network_error += 1,
            FetchStatus::RobotsBlocked => self.pages_robots_blocked += 1,
            FetchStatus::NotHtml => self.pages_not_html += 1,
        }

        if !result.issues.is_empty() {
            self.pages_with_issues += 1;
        }
        for issue in &result.issues {
            self.total_issues += 1;
            *self.issues_by_code.entry(issue.code.clone()).or_insert(0) += 1;
            self.issues_by_severity.add(severity_for(&issue.code));
        }
    }

    /// Pages that were attempted but produced no body
    pub fn total_errors(&self) -> u64 {
        self.pages_http_error + self.pages_timeout + self.pages_network_error
    }

    /// Returns the success rate as a percentage of fetched pages
    pub fn success_rate(&self) -> f64 {
        let attempted = self.pages_ok + self.total_errors();
        if attempted == 0 {
            return 0.0;
        }
        (self.pages_ok as f64 / attempted as f64) * 100.0
    }

    /// Issue codes ordered by count, most frequent first
    pub fn top_issue_codes(&self) -> Vec<(&str, u64)> {
        let mut codes: Vec<(&str, u64)> = self
            .issues_by_code
            .iter()
            .map(|(code, count)| (code.as_str(), *count))
            .collect();
        codes.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        codes
    }
}
