//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If the required variables are missing, falls back to a config file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `CLINIX_CALENDAR_BASE_URL` (required): calendar provider base URL
//! - `CLINIX_MESSAGING_BASE_URL` (required): messaging provider base URL
//! - `CLINIX_HTTP_TIMEOUT_MS`: per-attempt timeout for both integrations
//! - `CLINIX_HTTP_MAX_RETRIES`: attempts per call for both integrations
//! - `CLINIX_EVENT_BUS_MAX_RETRIES`: attempts per handler invocation
//! - `CLINIX_LOG_LEVEL`: default tracing filter (e.g. `info,clinix_core=debug`)
//! - `CLINIX_LOG_JSON`: emit JSON logs (true/false)
//!
//! ## File Locations
//! The loader probes `config.{json,toml}` and `clinix.{json,toml}` in the
//! working directory, its two parents, and next to the executable.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use clinix_domain::{ClinixError, Config, Result};

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `ClinixError::Config` if neither source yields a valid
/// configuration.
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// Unset optional variables keep their defaults.
///
/// # Errors
/// Returns `ClinixError::Config` if a required variable is missing or any
/// value is invalid.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();

    config.integrations.calendar.base_url = env_var("CLINIX_CALENDAR_BASE_URL")?;
    config.integrations.messaging.base_url = env_var("CLINIX_MESSAGING_BASE_URL")?;

    if let Some(timeout_ms) = env_parse::<u64>("CLINIX_HTTP_TIMEOUT_MS")? {
        config.integrations.calendar.timeout_ms = timeout_ms;
        config.integrations.messaging.timeout_ms = timeout_ms;
    }
    if let Some(max_retries) = env_parse::<u32>("CLINIX_HTTP_MAX_RETRIES")? {
        config.integrations.calendar.max_retries = max_retries;
        config.integrations.messaging.max_retries = max_retries;
    }
    if let Some(max_retries) = env_parse::<u32>("CLINIX_EVENT_BUS_MAX_RETRIES")? {
        config.event_bus.max_retries = max_retries;
    }
    if let Ok(level) = std::env::var("CLINIX_LOG_LEVEL") {
        config.logging.level = level;
    }
    config.logging.json = env_bool("CLINIX_LOG_JSON", config.logging.json);

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `ClinixError::Config` if the file is missing or unreadable, its
/// format is invalid, or the resulting configuration fails validation.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ClinixError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            ClinixError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| ClinixError::Config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration from string content, format chosen by extension.
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| ClinixError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| ClinixError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(ClinixError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    const NAMES: [&str; 4] = ["config.json", "config.toml", "clinix.json", "clinix.toml"];

    let mut roots = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        roots.extend([cwd.clone(), cwd.join(".."), cwd.join("../..")]);
    }
    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf)) {
        roots.extend([exe_dir.clone(), exe_dir.join("..")]);
    }

    roots
        .iter()
        .flat_map(|root| NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.exists())
}

/// Get required environment variable
fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| ClinixError::Config(format!("Missing required environment variable: {key}")))
}

/// Parse an optional environment variable
///
/// `Ok(None)` when unset; a config error when set but unparsable.
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ClinixError::Config(format!("Invalid value for {key}: {e}"))),
        Err(_) => Ok(None),
    }
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
