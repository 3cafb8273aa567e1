//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.
//! Every field has a default, so an empty object is a complete configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Default Airtable REST API root.
pub const DEFAULT_API_URL: &str = "https://api.airtable.com/v0";

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Airtable API settings.
    #[serde(default)]
    pub airtable: AirtableConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let airtable = &self.airtable;

        if !(airtable.api_url.starts_with("https://") || airtable.api_url.starts_with("http://")) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid api_url '{}'. Must be an http:// or https:// URL",
                    airtable.api_url
                ),
            });
        }
        if airtable.timeout_secs == 0 {
            return Err(ConfigError::ValidationError {
                message: "timeout_secs must be greater than 0".to_string(),
            });
        }
        if airtable.max_attempts == 0 {
            return Err(ConfigError::ValidationError {
                message: "max_attempts must be at least 1".to_string(),
            });
        }
        if airtable.retry_after_fallback_ms == 0 {
            return Err(ConfigError::ValidationError {
                message: "retry_after_fallback_ms must be greater than 0".to_string(),
            });
        }
        if airtable.max_retry_after_secs == 0 {
            return Err(ConfigError::ValidationError {
                message: "max_retry_after_secs must be greater than 0".to_string(),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            });
        }
        Ok(())
    }
}

/// Airtable API configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AirtableConfig {
    /// REST API root, without a trailing slash.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Upper bound on the wait for a single HTTP exchange, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Total attempts allowed for a request answered with HTTP 429.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Wait before retrying a 429 that carries no `Retry-After` header.
    #[serde(default = "default_retry_after_fallback_ms")]
    pub retry_after_fallback_ms: u64,

    /// Ceiling applied to server-provided `Retry-After` hints, in seconds.
    #[serde(default = "default_max_retry_after_secs")]
    pub max_retry_after_secs: u64,
}

impl AirtableConfig {
    /// Request deadline as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for AirtableConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            retry_after_fallback_ms: default_retry_after_fallback_ms(),
            max_retry_after_secs: default_max_retry_after_secs(),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_retry_after_fallback_ms() -> u64 {
    1000
}

const fn default_max_retry_after_secs() -> u64 {
    60
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
