use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::str::FromStr;

/// Environment variables that override file settings
pub const ENV_MAX_PAGES: &str = "SITEABLE_MAX_PAGES";
pub const ENV_CONCURRENCY: &str = "SITEABLE_CONCURRENCY";
pub const ENV_DELAY: &str = "SITEABLE_DELAY";
pub const ENV_RATE_LIMIT: &str = "SITEABLE_RATE_LIMIT";
pub const ENV_TIMEOUT: &str = "SITEABLE_TIMEOUT";
pub const ENV_DB_PATH: &str = "SITEABLE_DB_PATH";

/// Loads and parses a configuration file from the given path
///
/// Environment overrides are applied on top of the file before validation.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use siteable::config::load_config;
///
/// let config = load_config(Path::new("siteable.toml")).unwrap();
/// println!("Max pages: {}", config.scan.max_pages);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config: Config = toml::from_str(&content)?;
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate(&config)?;
    Ok(config)
}

/// Loads `path` if given, otherwise starts from defaults
///
/// Either way, environment overrides and validation are applied.
pub fn load_config_or_default(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => {
            let mut config = Config::default();
            apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
            validate(&config)?;
            Ok(config)
        }
    }
}

/// Applies `SITEABLE_*` overrides using `lookup` to read variables
///
/// Unset or empty variables are ignored; unparseable values are an error.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(value) = parse_env(&read, ENV_MAX_PAGES)? {
        config.scan.max_pages = value;
    }
    if let Some(value) = parse_env(&read, ENV_CONCURRENCY)? {
        config.scan.concurrency = value;
    }
    if let Some(value) = parse_env(&read, ENV_DELAY)? {
        config.scan.delay = value;
    }
    if let Some(value) = parse_env(&read, ENV_RATE_LIMIT)? {
        config.scan.rate_limit = value;
    }
    if let Some(value) = parse_env(&read, ENV_TIMEOUT)? {
        config.scan.request_timeout = value;
    }
    if let Some(value) = read(ENV_DB_PATH) {
        config.output.database_path = Some(value);
    }
    Ok(())
}

fn parse_env<T, F>(read: &F, name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match read(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv {
                name: name.to_string(),
                value: raw,
            }),
        None => Ok(None),
    }
}

/// Computes a SHA-256 hash of the configuration file content
///
/// This is used to detect if the configuration has changed between scan runs.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(hash_content(&content))
}

/// Hex-encoded SHA-256 of `content`
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
