//! Configuration loader
//!
//! ## Loading Strategy
//! 1. Read `.env` into the process environment (missing file is fine)
//! 2. Start from the first config file found, or from defaults
//! 3. Apply environment overrides
//! 4. Validate
//!
//! ## Environment Variables
//! - `FMS_API_URL`: API base URL
//! - `FMS_API_TIMEOUT_MS`: Request timeout in milliseconds
//! - `FMS_API_WITH_CREDENTIALS`: Keep a cookie jar (true/false)
//! - `FMS_STORAGE_BACKEND`: `memory`, `file` or `keyring`
//! - `FMS_STORAGE_PATH`: Credentials file for the `file` backend
//! - `FMS_KEYRING_SERVICE`: Keychain service name for the `keyring` backend
//! - `FMS_LOG_LEVEL`: Default log filter
//! - `FMS_LOG_JSON`: Emit JSON logs (true/false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./fms.{json,toml}` then `./config.{json,toml}`
//! 2. The same names in the parent and grandparent directories
//! 3. The same names next to the executable

use std::path::{Path, PathBuf};

use fms_domain::{Config, FmsError, Result};

const CONFIG_FILE_NAMES: [&str; 4] = ["fms.json", "fms.toml", "config.json", "config.toml"];

/// Load configuration from every source
///
/// # Errors
/// Returns `FmsError::Config` if a config file exists but cannot be parsed,
/// an override has an invalid value, or validation fails.
pub fn load() -> Result<Config> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "Loaded .env file");
    }

    let config = match probe_config_paths() {
        Some(path) => read_config(&path)?,
        None => {
            tracing::debug!("No config file found, using defaults");
            Config::default()
        }
    };

    let config = apply_env_overrides(config)?;
    validate(&config)?;
    tracing::info!(base_url = %config.api.base_url, backend = ?config.storage.backend, "Configuration loaded");
    Ok(config)
}

/// Load configuration from defaults and environment variables only
///
/// # Errors
/// Returns `FmsError::Config` if an override is invalid or validation fails.
pub fn load_from_env() -> Result<Config> {
    let config = apply_env_overrides(Config::default())?;
    validate(&config)?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations. Environment
/// overrides are not applied.
///
/// # Errors
/// Returns `FmsError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(FmsError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            FmsError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    let config = read_config(&config_path)?;
    validate(&config)?;
    Ok(config)
}

fn read_config(path: &Path) -> Result<Config> {
    tracing::info!(path = %path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(path)
        .map_err(|e| FmsError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, path)
}

/// Parse configuration, detecting the format by file extension
///
/// # Errors
/// Returns `FmsError::Config` if the format is unsupported or parsing fails.
pub fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| FmsError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| FmsError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(FmsError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe the standard locations for a configuration file
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.extend([cwd.clone(), cwd.join(".."), cwd.join("../..")]);
    }
    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf)) {
        dirs.push(exe_dir);
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.is_file())
}

/// Overlay `FMS_*` environment variables onto `config`
///
/// # Errors
/// Returns `FmsError::Config` if a numeric, boolean or backend value cannot
/// be parsed.
pub fn apply_env_overrides(mut config: Config) -> Result<Config> {
    if let Some(url) = env_opt("FMS_API_URL") {
        config.api.base_url = url;
    }
    if let Some(timeout) = env_opt("FMS_API_TIMEOUT_MS") {
        config.api.timeout_ms = timeout
            .parse()
            .map_err(|e| FmsError::Config(format!("Invalid FMS_API_TIMEOUT_MS: {e}")))?;
    }
    if let Some(value) = env_opt("FMS_API_WITH_CREDENTIALS") {
        config.api.with_credentials = parse_bool("FMS_API_WITH_CREDENTIALS", &value)?;
    }
    if let Some(backend) = env_opt("FMS_STORAGE_BACKEND") {
        config.storage.backend = backend.parse()?;
    }
    if let Some(path) = env_opt("FMS_STORAGE_PATH") {
        config.storage.path = path;
    }
    if let Some(service) = env_opt("FMS_KEYRING_SERVICE") {
        config.storage.service_name = service;
    }
    if let Some(level) = env_opt("FMS_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(value) = env_opt("FMS_LOG_JSON") {
        config.logging.json = parse_bool("FMS_LOG_JSON", &value)?;
    }
    Ok(config)
}

/// Check values that deserialize fine but cannot work
///
/// # Errors
/// Returns `FmsError::Config` describing the first invalid value.
pub fn validate(config: &Config) -> Result<()> {
    let url = url::Url::parse(&config.api.base_url)
        .map_err(|e| FmsError::Config(format!("Invalid API base URL '{}': {e}", config.api.base_url)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(FmsError::Config(format!("Unsupported API URL scheme: {}", url.scheme())));
    }
    if config.api.timeout_ms == 0 {
        return Err(FmsError::Config("API timeout must be greater than zero".to_string()));
    }
    if config.storage.path.trim().is_empty() {
        return Err(FmsError::Config("Storage path must not be empty".to_string()));
    }
    if config.storage.service_name.trim().is_empty() {
        return Err(FmsError::Config("Keyring service name must not be empty".to_string()));
    }
    Ok(())
}

/// Non-empty environment variable
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(FmsError::Config(format!("Invalid boolean for {key}: {other}"))),
    }
}
