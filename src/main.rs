//! SiteAble main entry point
//!
//! This is the command-line interface for the SiteAble accessibility scanner.

use anyhow::{bail, Context};
use clap::Parser;
use siteable::config::{compute_config_hash, hash_content, load_config_or_default, Config, OutputFormat};
use siteable::output::{load_statistics, print_statistics, write_report};
use siteable::storage::{open_storage, RunStatus, Storage};
use siteable::{normalize_url, registrable_domain, scan_site, AnalyzerTable, ResultSink, SqliteSink};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Log a progress line every this many results
const PROGRESS_EVERY: usize = 25;

/// SiteAble: a polite accessibility site scanner
///
/// SiteAble crawls a single site while respecting robots.txt, sitemaps and
/// crawl-delay, runs each page through the registered analyzers and writes
/// a report of the issues found.
#[derive(Parser, Debug)]
#[command(name = "siteable")]
#[command(version = "1.0.0")]
#[command(about = "A polite accessibility site scanner", long_about = None)]
struct Cli {
    /// Start URL of the site to scan
    #[arg(value_name = "URL", required_unless_present = "stats")]
    url: Option<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Maximum number of pages to fetch
    #[arg(long, value_name = "N")]
    max_pages: Option<usize>,

    /// Number of concurrent workers
    #[arg(long, value_name = "N")]
    concurrency: Option<usize>,

    /// Pause after each fetch, in seconds
    #[arg(long, value_name = "SECONDS")]
    delay: Option<f64>,

    /// Per-request timeout, in seconds
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<f64>,

    /// Cap on requests per second across all workers (0 = unlimited)
    #[arg(long, value_name = "N")]
    rate_limit: Option<f64>,

    /// Skip the named analyzer (repeatable)
    ///
    /// Applies to analyzers registered through the library API; the
    /// standalone binary registers none, so this only shows up in
    /// --dry-run and in the stored configuration hash.
    #[arg(long, value_name = "NAME")]
    exclude: Vec<String>,

    /// SQLite database to store results in
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Write the report to FILE instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Ignore robots.txt
    #[arg(long)]
    no_robots: bool,

    /// Do not seed the crawl from sitemaps
    #[arg(long)]
    no_sitemap: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,

    /// Validate configuration and show the effective settings without scanning
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,
}

impl Cli {
    /// Applies command-line flags on top of the loaded configuration
    fn apply_to(&self, config: &mut Config) {
        if let Some(max_pages) = self.max_pages {
            config.scan.max_pages = max_pages;
        }
        if let Some(concurrency) = self.concurrency {
            config.scan.concurrency = concurrency;
        }
        if let Some(delay) = self.delay {
            config.scan.delay = delay;
        }
        if let Some(timeout) = self.timeout {
            config.scan.request_timeout = timeout;
        }
        if let Some(rate_limit) = self.rate_limit {
            config.scan.rate_limit = rate_limit;
        }
        config.analyzers.exclude.extend(self.exclude.iter().cloned());
        if let Some(db) = &self.db {
            config.output.database_path = Some(db.display().to_string());
        }
        if let Some(format) = self.format {
            config.output.format = format;
        }
        if let Some(output) = &self.output {
            config.output.report_path = Some(output.display().to_string());
        }
        if self.no_robots {
            config.scan.respect_robots = false;
        }
        if self.no_sitemap {
            config.scan.use_sitemap = false;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let mut config = load_config_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;
    cli.apply_to(&mut config);
    siteable::config::validate(&config).context("Invalid settings")?;

    let config_hash = match &cli.config {
        Some(path) => compute_config_hash(path)?,
        None => hash_content(&toml::to_string(&config)?),
    };
    tracing::debug!("Configuration hash: {}", config_hash);

    if cli.stats {
        return handle_stats(&config);
    }

    // clap guarantees a URL whenever --stats is absent
    let Some(url) = cli.url.as_deref() else {
        bail!("a start URL is required");
    };

    if cli.dry_run {
        return handle_dry_run(url, &config);
    }

    handle_scan(url, config, &config_hash).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("siteable=info,warn"),
            1 => EnvFilter::new("siteable=debug,info"),
            2 => EnvFilter::new("siteable=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Handles the --dry-run mode: prints the effective configuration
fn handle_dry_run(url: &str, config: &Config) -> anyhow::Result<()> {
    let start = normalize_url(url).context("Invalid start URL")?;
    let options = config.scan_options();

    println!("=== SiteAble Dry Run ===\n");
    println!("Start URL: {}", start);

    println!("\nScan Configuration:");
    println!("  Max pages: {}", options.max_pages);
    println!("  Concurrency: {}", options.concurrency);
    println!("  Max connections: {}", options.effective_max_connections());
    println!("  Delay: {:?}", options.delay);
    println!("  Request timeout: {:?}", options.request_timeout);
    println!("  Default crawl delay: {:?}", options.default_crawl_delay);
    match options.max_depth {
        Some(depth) => println!("  Max depth: {}", depth),
        None => println!("  Max depth: unlimited"),
    }
    if options.rate_limit > 0.0 {
        println!("  Rate limit: {} req/s", options.rate_limit);
    } else {
        println!("  Rate limit: unlimited");
    }
    println!("  Respect robots.txt: {}", options.respect_robots);
    println!("  Use sitemaps: {}", options.use_sitemap);

    println!("\nUser Agent: {}", options.user_agent);

    if !options.exclude_analyzers.is_empty() {
        println!("\nExcluded analyzers: {}", options.exclude_analyzers.join(", "));
    }

    println!("\nOutput:");
    println!(
        "  Database: {}",
        config.output.database_path.as_deref().unwrap_or("(none)")
    );
    println!("  Format: {:?}", config.output.format);
    println!(
        "  Report: {}",
        config.output.report_path.as_deref().unwrap_or("(stdout)")
    );

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let Some(db_path) = config.output.database_path.as_deref() else {
        bail!("--stats needs a database (pass --db or set output.database-path)");
    };

    println!("Database: {}\n", db_path);
    let storage = open_storage(Path::new(db_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main scan operation
async fn handle_scan(url: &str, config: Config, config_hash: &str) -> anyhow::Result<()> {
    let start = normalize_url(url).context("Invalid start URL")?;
    let site = start
        .host_str()
        .map(registrable_domain)
        .unwrap_or_default();

    let mut options = config.scan_options();
    options.progress = Some(Arc::new(|done: usize, found: usize, url: &str| {
        if done % PROGRESS_EVERY == 0 {
            tracing::info!("{} pages scanned, {} URLs discovered (last: {})", done, found, url);
        }
    }));

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight pages");
            signal_token.cancel();
        }
    });

    let mut sinks: Vec<Arc<dyn ResultSink>> = Vec::new();
    let db_sink = match config.output.database_path.as_deref() {
        Some(db_path) => {
            let mut storage = open_storage(Path::new(db_path))
                .with_context(|| format!("Failed to open database {}", db_path))?;
            let run_id = storage.create_run(config_hash)?;
            tracing::info!("Recording results as run {} in {}", run_id, db_path);
            let sink = Arc::new(SqliteSink::new(storage, run_id, site.clone()));
            sinks.push(sink.clone());
            Some(sink)
        }
        None => None,
    };

    tracing::info!("Scanning {} ({})", start, site);
    let result = scan_site(
        start.as_str(),
        options,
        AnalyzerTable::new(),
        sinks,
        cancel.clone(),
    )
    .await;

    if let Some(sink) = &db_sink {
        let status = match &result {
            Ok(report) if !report.cancelled => RunStatus::Completed,
            Ok(_) => RunStatus::Interrupted,
            Err(_) => RunStatus::Failed,
        };
        sink.with_storage(|storage| match status {
            RunStatus::Completed => storage.complete_run(sink.run_id()),
            other => storage.update_run_status(sink.run_id(), other),
        })?;
    }

    let report = result.context("Scan failed")?;
    tracing::info!(
        "Scan finished: {} pages, {} issues in {:.1?}",
        report.results.len(),
        report.total_issues(),
        report.elapsed
    );

    write_report(
        &report,
        config.output.format,
        config.output.report_path.as_deref().map(Path::new),
    )?;

    if report.cancelled {
        tracing::warn!("Scan was cancelled; the report is partial");
    }

    Ok(())
}
