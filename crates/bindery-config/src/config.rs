//! Main configuration type.
//!
//! This module provides the top-level [`BinderyConfig`] struct and its presets.

use serde::{Deserialize, Serialize};

use crate::{ConfigError, DecodeConfig, LoggingConfig};

/// Complete Bindery configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load configuration from files
/// and environment variables.
///
/// # Example
///
/// ```
/// use bindery_config::BinderyConfig;
///
/// let config = BinderyConfig::default();
/// assert_eq!(config.decode.max_body_bytes, 1024 * 1024);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct BinderyConfig {
    /// Request decoding configuration.
    #[serde(default)]
    pub decode: DecodeConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BinderyConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - The body limit is zero
    /// - A JSON media type is not of the form `type/subtype`
    /// - The log level is not a valid filter directive
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.decode.max_body_bytes == 0 {
            return Err(ConfigError::invalid_value(
                "decode.max_body_bytes",
                "must be greater than 0",
            ));
        }

        for media_type in &self.decode.json_media_types {
            let valid = media_type.split_once('/').is_some_and(|(kind, subtype)| {
                !kind.trim().is_empty() && !subtype.trim().is_empty()
            });
            if !valid {
                return Err(ConfigError::invalid_value(
                    "decode.json_media_types",
                    format!("invalid media type: {media_type}"),
                ));
            }
        }

        if self.logging.enabled {
            crate::create_env_filter(&self.logging.level)?;
        }

        Ok(())
    }

    /// Create a development configuration preset.
    ///
    /// Debug-level pretty logs with colors.
    ///
    /// # Example
    ///
    /// ```
    /// use bindery_config::{BinderyConfig, LogFormat};
    ///
    /// let config = BinderyConfig::development();
    /// assert_eq!(config.logging.format, LogFormat::Pretty);
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();

        config.logging.level = "debug".to_string();
        config.logging.format = crate::LogFormat::Pretty;
        config.logging.ansi_enabled = true;

        config
    }

    /// Create a production configuration preset.
    ///
    /// Info-level JSON logs without colors.
    ///
    /// # Example
    ///
    /// ```
    /// use bindery_config::{BinderyConfig, LogFormat};
    ///
    /// let config = BinderyConfig::production();
    /// assert_eq!(config.logging.format, LogFormat::Json);
    /// ```
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();

        config.logging.level = "info".to_string();
        config.logging.format = crate::LogFormat::Json;
        config.logging.ansi_enabled = false;

        config
    }

    /// Build a [`bindery::Decoder`] from the decode section.
    ///
    /// # Example
    ///
    /// ```
    /// use bindery_config::BinderyConfig;
    ///
    /// let decoder = BinderyConfig::default().decoder();
    /// assert_eq!(decoder.options().max_body_size, 1024 * 1024);
    /// ```
    #[must_use]
    pub fn decoder(&self) -> bindery::Decoder {
        bindery::Decoder::with_options(self.decode.to_decode_options())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LogFormat;

    #[test]
    fn test_default_config_is_valid() {
        assert!(BinderyConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_body_limit_is_rejected() {
        let mut config = BinderyConfig::default();
        config.decode.max_body_bytes = 0;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("decode.max_body_bytes"));
    }

    #[test]
    fn test_malformed_media_type_is_rejected() {
        let mut config = BinderyConfig::default();
        config.decode.json_media_types = vec!["json".to_string()];

        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref field, .. } if field == "decode.json_media_types"
        ));
    }

    #[test]
    fn test_invalid_log_level_is_rejected() {
        let mut config = BinderyConfig::default();
        config.logging.level = "bindery=loud".to_string();
        assert!(config.validate().is_err());

        config.logging.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_development_preset() {
        let config = BinderyConfig::development();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.logging.ansi_enabled);
    }

    #[test]
    fn test_production_preset() {
        let config = BinderyConfig::production();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(!config.logging.ansi_enabled);
    }

    #[test]
    fn test_decoder_uses_decode_section() {
        let mut config = BinderyConfig::default();
        config.decode.max_body_bytes = 64;
        config.decode.json_media_types = vec!["application/merge-patch+json".to_string()];

        let decoder = config.decoder();
        assert_eq!(decoder.options().max_body_size, 64);
        assert_eq!(
            decoder.options().json_media_types,
            vec!["application/merge-patch+json"]
        );
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: BinderyConfig = toml::from_str("[logging]\nlevel = \"warn\"").unwrap();
        assert_eq!(config.logging.level, "warn");
        assert!(config.logging.enabled);
        assert_eq!(config.decode, DecodeConfig::default());
    }

    #[test]
    fn test_unknown_section_is_rejected() {
        let result: Result<BinderyConfig, _> = toml::from_str("[server]\nport = 1");
        assert!(result.is_err());
    }
}
