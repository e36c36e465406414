//! Core crawl data types

use crate::analyzer::Issue;
use crate::url::normalize_url;
use crate::UrlError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use url::Url;

/// How a URL entered the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlSource {
    Seed,
    Sitemap,
    Discovered,
}

/// A unit of crawl work: one normalized URL to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTarget {
    pub url: Url,
    pub source: CrawlSource,
    pub depth: u32,
}

impl CrawlTarget {
    /// Builds a target from an already-parsed URL
    pub fn new(url: Url, source: CrawlSource, depth: u32) -> Self {
        Self { url, source, depth }
    }

    /// Normalizes `raw` and builds a target from it
    pub fn parse(raw: &str, source: CrawlSource, depth: u32) -> Result<Self, UrlError> {
        Ok(Self::new(normalize_url(raw)?, source, depth))
    }
}

/// Terminal outcome of one page fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "status", rename_all = "snake_case")]
pub enum FetchStatus {
    Ok,
    HttpError(u16),
    Timeout,
    NetworkError,
    RobotsBlocked,
    /// 2xx response whose Content-Type is not HTML; the body was not analyzed
    NotHtml,
}

impl FetchStatus {
    /// Stable identifier used in storage and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchStatus::Ok => "ok",
            FetchStatus::HttpError(_) => "http_error",
            FetchStatus::Timeout => "timeout",
            FetchStatus::NetworkError => "network_error",
            FetchStatus::RobotsBlocked => "robots_blocked",
            FetchStatus::NotHtml => "not_html",
        }
    }

    /// HTTP status code, when there is one
    pub fn status_code(&self) -> Option<u16> {
        match self {
            FetchStatus::HttpError(code) => Some(*code),
            _ => None,
        }
    }

    /// Rebuilds a status from its stored form
    pub fn from_parts(kind: &str, code: Option<u16>) -> Option<Self> {
        match kind {
            "ok" => Some(FetchStatus::Ok),
            "http_error" => Some(FetchStatus::HttpError(code.unwrap_or(0))),
            "timeout" => Some(FetchStatus::Timeout),
            "network_error" => Some(FetchStatus::NetworkError),
            "robots_blocked" => Some(FetchStatus::RobotsBlocked),
            "not_html" => Some(FetchStatus::NotHtml),
            _ => None,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, FetchStatus::Ok)
    }
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStatus::HttpError(code) => write!(f, "http_error({})", code),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Everything recorded about one URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    pub url: String,
    pub issues: Vec<Issue>,
    pub fetch_status: FetchStatus,
    /// Every link found on the page, in or out of scope
    pub discovered_links: Vec<String>,
}

impl PageResult {
    /// A result for a page that produced no body
    pub fn failed(url: impl Into<String>, fetch_status: FetchStatus) -> Self {
        Self {
            url: url.into(),
            issues: Vec::new(),
            fetch_status,
            discovered_links: Vec::new(),
        }
    }
}

/// Summary of a finished (or cancelled) crawl
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub start_url: String,
    /// url → result, one entry per URL that reached a terminal state
    pub results: HashMap<String, PageResult>,
    /// Page fetches initiated, i.e. budget consumed
    pub pages_fetched: usize,
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl CrawlReport {
    /// The `url → issues` view of the results
    pub fn issues_by_url(&self) -> HashMap<String, Vec<Issue>> {
        self.results
            .iter()
            .map(|(url, result)| (url.clone(), result.issues.clone()))
            .collect()
    }

    pub fn total_issues(&self) -> usize {
        self.results.values().map(|r| r.issues.len()).sum()
    }

    /// Results sorted by URL, for stable output
    pub fn sorted_results(&self) -> Vec<&PageResult> {
        let mut results: Vec<&PageResult> = self.results.values().collect();
        results.sort_by(|a, b| a.url.cmp(&b.url));
        results
    }
}

/// Lifecycle of a crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlPhase {
    Idle,
    Seeding,
    Running,
    Draining,
    Done,
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CrawlPhase::Idle => "idle",
            CrawlPhase::Seeding => "seeding",
            CrawlPhase::Running => "running",
            CrawlPhase::Draining => "draining",
            CrawlPhase::Done => "done",
        };
        f.write_str(name)
    }
}
