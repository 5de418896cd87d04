//! Typed configuration for the Bindery decoder.
//!
//! This crate loads the settings a service needs to run a [`bindery::Decoder`]
//! and to see its diagnostics:
//! - TOML and JSON configuration files
//! - Environment variable overrides
//! - Strict validation (fails on unknown fields)
//! - Layered configuration (defaults → file → env)
//! - A `tracing` subscriber built from the logging section
//!
//! # Example
//!
//! ```no_run
//! use bindery_config::{init_logging, ConfigLoader};
//!
//! # fn main() -> Result<(), bindery_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_defaults()
//!     .with_optional_file("bindery.toml")?
//!     .with_env_prefix("BINDERY")
//!     .load()?;
//!
//! init_logging(&config.logging)?;
//! let decoder = config.decoder();
//! # let _ = decoder;
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [decode]
//! max_body_bytes = 1048576
//! json_media_types = ["application/problem+json"]
//!
//! [logging]
//! enabled = true
//! level = "info,bindery=debug"
//! format = "json"
//! ansi_enabled = false
//! ```
//!
//! # Environment Variable Overrides
//!
//! Values can be overridden via environment variables using the format
//! `PREFIX__SECTION__KEY`:
//!
//! - `BINDERY__DECODE__MAX_BODY_BYTES=65536`
//! - `BINDERY__DECODE__JSON_MEDIA_TYPES=application/problem+json,application/vnd.api+json`
//! - `BINDERY__LOGGING__ENABLED=false`
//! - `BINDERY__LOGGING__LEVEL=debug`
//! - `BINDERY__LOGGING__FORMAT=pretty`
//! - `BINDERY__LOGGING__ANSI_ENABLED=true`

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod logging;
mod schema;

pub use config::BinderyConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use logging::{create_env_filter, init_logging};
pub use schema::{DecodeConfig, LogFormat, LoggingConfig};
