//! Configuration section types.

use serde::{Deserialize, Serialize};

/// Request decoding limits and media types.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DecodeConfig {
    /// Largest request body buffered before decoding fails.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Media types decoded as JSON in addition to `application/json`.
    #[serde(default)]
    pub json_media_types: Vec<String>,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: default_max_body_bytes(),
            json_media_types: Vec::new(),
        }
    }
}

impl DecodeConfig {
    /// Build the decoder options this section describes.
    ///
    /// # Example
    ///
    /// ```
    /// use bindery_config::DecodeConfig;
    ///
    /// let section = DecodeConfig {
    ///     max_body_bytes: 4096,
    ///     json_media_types: vec!["application/problem+json".to_string()],
    /// };
    ///
    /// let options = section.to_decode_options();
    /// assert_eq!(options.max_body_size, 4096);
    /// ```
    #[must_use]
    pub fn to_decode_options(&self) -> bindery::DecodeOptions {
        self.json_media_types.iter().fold(
            bindery::DecodeOptions::new().max_body_size(self.max_body_bytes),
            |options, media_type| options.json_media_type(media_type.as_str()),
        )
    }
}

impl From<&DecodeConfig> for bindery::DecodeOptions {
    fn from(config: &DecodeConfig) -> Self {
        config.to_decode_options()
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON formatted logs (production).
    #[default]
    Json,
    /// Human-readable pretty format (development).
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log filter directive, such as `info` or `bindery=debug`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Enable ANSI colors in pretty output.
    #[serde(default)]
    pub ansi_enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::Json,
            ansi_enabled: false,
        }
    }
}

fn default_max_body_bytes() -> usize {
    bindery::DEFAULT_MAX_BODY_SIZE
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_defaults_match_engine() {
        let config = DecodeConfig::default();
        assert_eq!(config.max_body_bytes, bindery::DEFAULT_MAX_BODY_SIZE);
        assert!(config.json_media_types.is_empty());
    }

    #[test]
    fn test_decode_options_conversion() {
        let config = DecodeConfig {
            max_body_bytes: 512,
            json_media_types: vec![
                "application/problem+json".to_string(),
                "application/vnd.api+json".to_string(),
            ],
        };

        let options = bindery::DecodeOptions::from(&config);
        assert_eq!(options.max_body_size, 512);
        assert_eq!(
            options.json_media_types,
            vec!["application/problem+json", "application/vnd.api+json"]
        );
    }

    #[test]
    fn test_logging_defaults() {
        let config = LoggingConfig::default();
        assert!(config.enabled);
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn test_log_format_serde() {
        let format: LogFormat = serde_json::from_str("\"pretty\"").unwrap();
        assert_eq!(format, LogFormat::Pretty);
        assert_eq!(serde_json::to_string(&LogFormat::Json).unwrap(), "\"json\"");
    }

    #[test]
    fn test_sections_reject_unknown_fields() {
        let result: Result<DecodeConfig, _> = toml::from_str("max_body = 10");
        assert!(result.is_err());
    }
}
