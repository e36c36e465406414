//! SiteAble: a polite accessibility site scanner
//!
//! This crate implements a concurrent site crawler that respects robots.txt,
//! sitemaps and crawl-delay, deduplicates its URL frontier, and hands each
//! fetched page to a pluggable analyzer dispatch table before emitting the
//! result to one or more result sinks.

pub mod analyzer;
pub mod config;
pub mod crawler;
pub mod output;
pub mod robots;
pub mod severity;
pub mod sink;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for SiteAble operations
#[derive(Debug, Error)]
pub enum SiteableError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    StorageError(#[from] storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Analyzer registration error: {0}")]
    Analyzer(#[from] analyzer::AnalyzerError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Crawl invariant violated: {0}")]
    Invariant(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid environment override {name}: {value}")]
    InvalidEnv { name: String, value: String },
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for SiteAble operations
pub type Result<T> = std::result::Result<T, SiteableError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use analyzer::{Analyzer, AnalyzerTable, FnAnalyzer, Issue};
pub use config::Config;
pub use crawler::{
    scan_site, scan_site_with_fetcher, CrawlReport, CrawlSource, CrawlTarget, FetchStatus,
    PageResult, ScanOptions,
};
pub use severity::{severity_for, Severity};
pub use sink::{MemorySink, ResultSink, SqliteSink};
pub use url::{extract_domain, normalize_url, registrable_domain};
