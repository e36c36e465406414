//! Crawler module for site scanning
//!
//! This module contains the core crawling logic, including:
//! - The deduplicating frontier and the page budget
//! - HTTP fetching behind a global connection ceiling
//! - HTML link extraction and analyzer dispatch
//! - Overall crawl coordination and cancellation

mod budget;
mod coordinator;
mod fetcher;
mod frontier;
mod pipeline;
mod rate_limit;
mod types;

pub use budget::CrawlBudget;
pub use coordinator::Coordinator;
pub use fetcher::{
    build_http_client, is_html_content_type, FetchError, FetchGate, Fetcher, HttpFetcher,
    MAX_REDIRECTS,
};
pub use frontier::Frontier;
pub use pipeline::{extract_links, process_page, DiscoveredLink, PageOutcome};
pub use rate_limit::RateLimiter;
pub use types::{CrawlPhase, CrawlReport, CrawlSource, CrawlTarget, FetchStatus, PageResult};

use crate::analyzer::AnalyzerTable;
use crate::sink::ResultSink;
use crate::SiteableError;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// User-Agent sent when none is configured
pub const DEFAULT_USER_AGENT: &str = "SiteAble-Scanner/1.0 (+https://github.com/ghyathmoussa/SiteAble)";

/// Called after each result with `(results so far, URLs discovered, url)`
pub type ProgressFn = Arc<dyn Fn(usize, usize, &str) + Send + Sync>;

/// Knobs for a single crawl
#[derive(Clone)]
pub struct ScanOptions {
    /// Maximum number of page fetches to initiate
    pub max_pages: usize,

    /// Number of concurrent workers
    pub concurrency: usize,

    /// Minimum pause after each fetch, applied per worker
    pub delay: Duration,

    /// Analyzer names to skip
    pub exclude_analyzers: Vec<String>,

    pub request_timeout: Duration,

    pub user_agent: String,

    /// Ceiling on simultaneous outbound requests; `None` uses `concurrency`
    pub max_connections: Option<usize>,

    /// Delay used for hosts whose robots.txt sets no `Crawl-delay`
    pub default_crawl_delay: Duration,

    pub respect_robots: bool,

    pub use_sitemap: bool,

    /// Deepest link level to follow; the start URL and sitemap URLs are depth 0
    pub max_depth: Option<u32>,

    /// Global requests per second; 0 means unlimited
    pub rate_limit: f64,

    pub progress: Option<ProgressFn>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_pages: 200,
            concurrency: 10,
            delay: Duration::ZERO,
            exclude_analyzers: Vec::new(),
            request_timeout: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_connections: None,
            default_crawl_delay: Duration::ZERO,
            respect_robots: true,
            use_sitemap: true,
            max_depth: None,
            rate_limit: 0.0,
            progress: None,
        }
    }
}

impl ScanOptions {
    pub fn effective_max_connections(&self) -> usize {
        self.max_connections.unwrap_or(self.concurrency).max(1)
    }
}

impl std::fmt::Debug for ScanOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanOptions")
            .field("max_pages", &self.max_pages)
            .field("concurrency", &self.concurrency)
            .field("delay", &self.delay)
            .field("exclude_analyzers", &self.exclude_analyzers)
            .field("request_timeout", &self.request_timeout)
            .field("user_agent", &self.user_agent)
            .field("max_connections", &self.max_connections)
            .field("default_crawl_delay", &self.default_crawl_delay)
            .field("respect_robots", &self.respect_robots)
            .field("use_sitemap", &self.use_sitemap)
            .field("max_depth", &self.max_depth)
            .field("rate_limit", &self.rate_limit)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// Scans a site over HTTP
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the HTTP client
/// 2. Load robots.txt and sitemaps for the start host
/// 3. Run `concurrency` workers until the frontier drains, the page budget
///    is spent, or `cancel` fires
/// 4. Return every page result, also emitted to each sink as it arrived
///
/// # Errors
///
/// Only an invalid start URL or a failure to build the HTTP client is an
/// error. Individual page failures are recorded in the report.
///
/// # Example
///
/// ```no_run
/// use siteable::{scan_site, AnalyzerTable, ScanOptions};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> siteable::Result<()> {
/// let report = scan_site(
///     "https://example.com/",
///     ScanOptions::default(),
///     AnalyzerTable::new(),
///     Vec::new(),
///     CancellationToken::new(),
/// )
/// .await?;
/// println!("{} pages", report.results.len());
/// # Ok(())
/// # }
/// ```
pub async fn scan_site(
    start_url: &str,
    options: ScanOptions,
    dispatch: AnalyzerTable,
    sinks: Vec<Arc<dyn ResultSink>>,
    cancel: CancellationToken,
) -> Result<CrawlReport, SiteableError> {
    let fetcher = HttpFetcher::new(&options.user_agent, options.request_timeout)?;
    scan_site_with_fetcher(start_url, options, dispatch, sinks, Arc::new(fetcher), cancel).await
}

/// Like [`scan_site`], with an injected [`Fetcher`]
pub async fn scan_site_with_fetcher(
    start_url: &str,
    options: ScanOptions,
    dispatch: AnalyzerTable,
    sinks: Vec<Arc<dyn ResultSink>>,
    fetcher: Arc<dyn Fetcher>,
    cancel: CancellationToken,
) -> Result<CrawlReport, SiteableError> {
    Coordinator::new(start_url, options, dispatch, sinks, fetcher, cancel)?
        .run()
        .await
}
