use crate::crawler::ScanOptions;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure for SiteAble
///
/// Every section and field has a default, so an empty file (or no file at
/// all) is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    pub scan: ScanConfig,
    pub user_agent: UserAgentConfig,
    pub analyzers: AnalyzersConfig,
    pub output: OutputConfig,
}

/// Crawl behavior configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ScanConfig {
    /// Maximum number of pages to fetch
    pub max_pages: usize,

    /// Number of concurrent workers
    pub concurrency: usize,

    /// Pause after each fetch, in seconds
    pub delay: f64,

    /// Per-request timeout, in seconds
    pub request_timeout: f64,

    /// Ceiling on simultaneous connections (defaults to `concurrency`)
    pub max_connections: Option<usize>,

    /// Delay for hosts whose robots.txt has no Crawl-delay, in seconds
    pub default_crawl_delay: f64,

    pub respect_robots: bool,

    pub use_sitemap: bool,

    /// Deepest link level to follow from the start URL
    pub max_depth: Option<u32>,

    /// Global requests per second (0 = unlimited)
    pub rate_limit: f64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_pages: 200,
            concurrency: 10,
            delay: 0.0,
            request_timeout: 10.0,
            max_connections: None,
            default_crawl_delay: 0.0,
            respect_robots: true,
            use_sitemap: true,
            max_depth: None,
            rate_limit: 0.0,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the crawler
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,

    /// URL with information about the crawler
    pub contact_url: String,

    /// Optional email address for crawler-related contact
    pub contact_email: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "SiteAble-Scanner".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://github.com/ghyathmoussa/SiteAble".to_string(),
            contact_email: None,
        }
    }
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    ///
    /// Format: `Name/Version (+ContactURL)` or
    /// `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        match self.contact_email.as_deref().filter(|e| !e.is_empty()) {
            Some(email) => format!(
                "{}/{} (+{}; {})",
                self.crawler_name, self.crawler_version, self.contact_url, email
            ),
            None => format!(
                "{}/{} (+{})",
                self.crawler_name, self.crawler_version, self.contact_url
            ),
        }
    }
}

/// Analyzer selection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AnalyzersConfig {
    /// Analyzer names to skip
    pub exclude: Vec<String>,
}

/// Report format written at the end of a scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Markdown,
    /// Standalone HTML page
    Html,
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the SQLite results database; results are not persisted when unset
    pub database_path: Option<String>,

    pub format: OutputFormat,

    /// File to write the report to instead of stdout
    pub report_path: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            format: OutputFormat::Text,
            report_path: None,
        }
    }
}

fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or_default()
}

impl Config {
    /// Builds crawl options from a validated configuration
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            max_pages: self.scan.max_pages,
            concurrency: self.scan.concurrency,
            delay: seconds(self.scan.delay),
            exclude_analyzers: self.analyzers.exclude.clone(),
            request_timeout: seconds(self.scan.request_timeout),
            user_agent: self.user_agent.header_value(),
            max_connections: self.scan.max_connections,
            default_crawl_delay: seconds(self.scan.default_crawl_delay),
            respect_robots: self.scan.respect_robots,
            use_sitemap: self.scan.use_sitemap,
            max_depth: self.scan.max_depth,
            rate_limit: self.scan.rate_limit,
            progress: None,
        }
    }
}
