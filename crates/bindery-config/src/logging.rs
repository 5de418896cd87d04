//! Structured logging setup.
//!
//! Installs a global `tracing` subscriber described by a [`LoggingConfig`].
//! The decoder emits its diagnostics through `tracing`, so nothing is printed
//! until a subscriber like this one is installed.
//!
//! # Example
//!
//! ```rust,no_run
//! use bindery_config::{init_logging, BinderyConfig};
//!
//! # fn main() -> Result<(), bindery_config::ConfigError> {
//! let config = BinderyConfig::development();
//! init_logging(&config.logging)?;
//!
//! tracing::info!(max_body_bytes = config.decode.max_body_bytes, "decoder ready");
//! # Ok(())
//! # }
//! ```

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::{ConfigError, LogFormat, LoggingConfig};

/// Installs the global logging subscriber.
///
/// Does nothing when logging is disabled.
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` if the level is not a valid filter,
/// and `ConfigError::LoggingInit` if a global subscriber is already set.
pub fn init_logging(config: &LoggingConfig) -> Result<(), ConfigError> {
    if !config.enabled {
        return Ok(());
    }

    let filter = create_env_filter(&config.level)?;

    match config.format {
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_target(true)
                .with_filter(filter);

            tracing_subscriber::registry()
                .with(fmt_layer)
                .try_init()
                .map_err(|e| ConfigError::LoggingInit(e.to_string()))?;
        }
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .pretty()
                .with_ansi(config.ansi_enabled)
                .with_file(true)
                .with_line_number(true)
                .with_target(true)
                .with_filter(filter);

            tracing_subscriber::registry()
                .with(fmt_layer)
                .try_init()
                .map_err(|e| ConfigError::LoggingInit(e.to_string()))?;
        }
    }

    Ok(())
}

/// Creates an env filter from a directive string such as `info,bindery=debug`.
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` if the directive does not parse.
pub fn create_env_filter(filter: &str) -> Result<EnvFilter, ConfigError> {
    EnvFilter::try_new(filter)
        .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))
}
