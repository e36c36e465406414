//! Configuration module for SiteAble
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, with `SITEABLE_*` environment variables layered on top.
//!
//! # Example
//!
//! ```no_run
//! use siteable::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("siteable.toml")).unwrap();
//! println!("Scanner will fetch at most {} pages", config.scan.max_pages);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{AnalyzersConfig, Config, OutputConfig, OutputFormat, ScanConfig, UserAgentConfig};

pub use parser::{
    apply_env_overrides, compute_config_hash, hash_content, load_config, load_config_or_default,
    load_config_with_hash, ENV_CONCURRENCY, ENV_DB_PATH, ENV_DELAY, ENV_MAX_PAGES, ENV_RATE_LIMIT,
    ENV_TIMEOUT,
};

pub use validation::validate;
