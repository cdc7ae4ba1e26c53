//! Configuration management

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_API_BASE_URL, DEFAULT_API_TIMEOUT_MS, DEFAULT_CREDENTIALS_FILE, DEFAULT_KEYRING_SERVICE,
};

/// Client configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Backend API configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every request path is appended to (e.g. `https://api.example.com/api/v1`)
    pub base_url: String,
    /// Timeout applied to every request, refresh calls included
    pub timeout_ms: u64,
    /// Keep a cookie jar so HTTP-only refresh cookies travel with requests
    pub with_credentials: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_ms: DEFAULT_API_TIMEOUT_MS,
            with_credentials: true,
        }
    }
}

/// Where credentials survive process restarts
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process memory only; tokens are lost on exit
    Memory,
    /// JSON file on disk
    #[default]
    File,
    /// Platform keychain
    Keyring,
}

impl std::str::FromStr for StorageBackend {
    type Err = crate::FmsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            "keyring" | "keychain" => Ok(Self::Keyring),
            other => Err(crate::FmsError::Config(format!("Unknown storage backend: {other}"))),
        }
    }
}

/// Credential storage configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// File path for the `file` backend
    pub path: String,
    /// Keychain service name for the `keyring` backend
    pub service_name: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: DEFAULT_CREDENTIALS_FILE.to_string(),
            service_name: DEFAULT_KEYRING_SERVICE.to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of the human formatter
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}
