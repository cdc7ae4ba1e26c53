//! Tracing bootstrap
//!
//! `RUST_LOG` wins when set; otherwise the configured level is used. Token
//! values are never recorded as span or event fields.

use fms_domain::{FmsError, LoggingConfig, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// # Errors
///
/// Returns `FmsError::Config` if the configured level is not a valid filter
/// directive, or `FmsError::Internal` if a global subscriber is already set.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| FmsError::Config(format!("Invalid log level '{}': {e}", config.level)))?,
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if config.json {
        registry.with(tracing_subscriber::fmt::layer().json().with_target(true)).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer().with_target(true)).try_init()
    };

    result.map_err(|e| FmsError::Internal(format!("Failed to install tracing subscriber: {e}")))
}
