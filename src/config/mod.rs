//! Configuration file loading and credential lookup.
//!
//! This module handles loading the optional configuration file from disk and
//! reading the Airtable personal access token from the environment.
//!
//! # Configuration File Locations
//!
//! The configuration file is searched in the following order:
//!
//! 1. Path given as the first CLI argument (must exist)
//! 2. Default location (optional; defaults apply when absent):
//!    - **Linux/macOS:** `~/.airtable-mcp/config.json`
//!    - **Windows:** `%USERPROFILE%\.airtable-mcp\config.json`
//!
//! # Credentials
//!
//! The token is never read from the configuration file. See [`ApiToken`].

mod credentials;
mod settings;

pub use credentials::{ApiToken, TOKEN_ENV_VAR, TOKEN_ENV_VAR_FALLBACK};
pub use settings::{AirtableConfig, Config, LoggingConfig, DEFAULT_API_URL};

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Returns the default configuration directory.
///
/// - **Linux/macOS:** `~/.airtable-mcp/`
/// - **Windows:** `%USERPROFILE%\.airtable-mcp\`
#[must_use]
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|p| p.join(".airtable-mcp"))
}

/// Returns the platform-specific default configuration file path.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|p| p.join("config.json"))
}

/// Loads and parses the configuration file.
///
/// If `path` is `None`, the default location is tried and a missing file
/// there yields the built-in defaults.
///
/// # Errors
///
/// Returns an error if:
/// - An explicitly given configuration file cannot be found
/// - The file cannot be read
/// - The JSON is malformed
/// - Any value fails validation
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ConfigError::NotFound {
                    path: p.to_path_buf(),
                });
            }
            p.to_path_buf()
        }
        None => match default_config_path() {
            Some(p) if p.exists() => p,
            _ => return Ok(Config::default()),
        },
    };

    let contents = std::fs::read_to_string(&config_path).map_err(|e| ConfigError::ReadError {
        path: config_path.clone(),
        source: e,
    })?;

    let config: Config = serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: config_path.clone(),
        source: e,
    })?;

    // Validate the configuration
    config.validate()?;

    Ok(config)
}
