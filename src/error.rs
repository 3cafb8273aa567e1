//! Startup error types for airtable-mcp.
//!
//! # Security Note
//!
//! Error messages are carefully crafted to NEVER include credentials.
//! The token is only ever described by the name of the variable it was
//! expected in, never by its value.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading configuration or credentials.
///
/// Every variant is fatal: the server refuses to start.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },

    /// No Airtable personal access token was supplied.
    #[error(
        "{variable} environment variable is required. \
         Create a personal access token at https://airtable.com/create/tokens"
    )]
    MissingToken {
        /// Name of the environment variable that was checked.
        variable: &'static str,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to initialise HTTP client: {message}")]
    HttpClient {
        /// Description of the failure.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let error = ConfigError::NotFound {
            path: PathBuf::from("/path/to/config.json"),
        };
        let msg = error.to_string();
        assert!(msg.contains("not found"));
        assert!(msg.contains("config.json"));
    }

    #[test]
    fn validation_error_display() {
        let error = ConfigError::ValidationError {
            message: "invalid setting".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.contains("invalid setting"));
    }

    #[test]
    fn missing_token_names_variable() {
        let error = ConfigError::MissingToken {
            variable: "AIRTABLE_API_KEY",
        };
        let msg = error.to_string();
        assert!(msg.contains("AIRTABLE_API_KEY"));
        assert!(msg.contains("required"));
    }
}
