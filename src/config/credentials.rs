//! Airtable personal access token handling.
//!
//! The token is read exactly once at startup and then moved into the
//! gateway. It is never logged: both `Debug` and `Display` redact it.

use std::fmt;

use crate::error::ConfigError;

/// Primary environment variable holding the personal access token.
pub const TOKEN_ENV_VAR: &str = "AIRTABLE_API_KEY";

/// Fallback variable name accepted for the same token.
pub const TOKEN_ENV_VAR_FALLBACK: &str = "AIRTABLE_TOKEN";

/// An Airtable personal access token.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    /// Wraps a token value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingToken`] if the value is empty or whitespace.
    pub fn new(value: impl Into<String>) -> Result<Self, ConfigError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::MissingToken {
                variable: TOKEN_ENV_VAR,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Reads the token from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingToken`] if neither variable holds a value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolves the token through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingToken`] if neither variable holds a value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        [TOKEN_ENV_VAR, TOKEN_ENV_VAR_FALLBACK]
            .into_iter()
            .filter_map(|name| lookup(name))
            .find_map(|value| Self::new(value).ok())
            .ok_or(ConfigError::MissingToken {
                variable: TOKEN_ENV_VAR,
            })
    }

    /// Returns the raw token for use in the `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken(<redacted>)")
    }
}

impl fmt::Display for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}
