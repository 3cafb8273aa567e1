//! Error types for Airtable tool calls.
//!
//! Every failure a tool call can produce is an [`AirtableError`]. Its
//! [`ErrorKind`] is the small, stable tag reported to the calling agent.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Result type for Airtable operations.
pub type AirtableResult<T> = Result<T, AirtableError>;

/// Stable error vocabulary reported at the MCP boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// Malformed tool input, caught before any network call.
    InvalidArgument,
    /// Base, table or record does not exist (HTTP 404).
    NotFound,
    /// Invalid or under-scoped token (HTTP 401/403).
    AuthError,
    /// Airtable rejected the request body or query (HTTP 422).
    ValidationError,
    /// HTTP 429 persisted through the retry budget.
    RateLimited,
    /// The request exceeded its deadline.
    Timeout,
    /// Any other server or transport failure.
    UpstreamError,
}

impl ErrorKind {
    /// Returns the tag as it appears in tool results.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidArgument => "InvalidArgument",
            Self::NotFound => "NotFound",
            Self::AuthError => "AuthError",
            Self::ValidationError => "ValidationError",
            Self::RateLimited => "RateLimited",
            Self::Timeout => "Timeout",
            Self::UpstreamError => "UpstreamError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while serving a tool call.
#[derive(Debug, Error)]
pub enum AirtableError {
    /// A tool argument is missing or malformed.
    #[error("Invalid argument '{name}': {message}")]
    InvalidArgument {
        /// Argument name.
        name: String,
        /// Description of what's wrong.
        message: String,
    },

    /// The addressed resource does not exist.
    #[error("Not found: {message}")]
    NotFound {
        /// Airtable's explanation, or a generic hint.
        message: String,
    },

    /// The token was rejected or lacks the required scope.
    #[error("Authorisation failed (HTTP {status}): {message}")]
    Auth {
        /// HTTP status (401 or 403).
        status: u16,
        /// Airtable's explanation, or a generic hint.
        message: String,
    },

    /// Airtable rejected the request contents.
    #[error("Invalid request: {message}")]
    Validation {
        /// Airtable's explanation.
        message: String,
    },

    /// Airtable kept answering 429.
    #[error("Rate limited by Airtable after {attempts} attempts. Wait and retry.")]
    RateLimited {
        /// Number of requests sent before giving up.
        attempts: u32,
    },

    /// The request did not complete within the deadline.
    #[error("Request timed out after {seconds}s. A create or update may still have been applied.")]
    Timeout {
        /// Deadline that was exceeded, in seconds.
        seconds: u64,
    },

    /// Airtable returned an unexpected status.
    #[error("Airtable API error: HTTP {status} - {message}")]
    Upstream {
        /// HTTP status code.
        status: u16,
        /// Airtable's explanation or the raw body.
        message: String,
    },

    /// The request could not be delivered or the response not understood.
    #[error("Airtable API error: {message}")]
    Transport {
        /// Description of the failure.
        message: String,
    },
}

impl AirtableError {
    /// Creates an invalid argument error.
    pub fn invalid_argument(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates a missing argument error.
    pub fn missing_argument(name: impl Into<String>) -> Self {
        Self::invalid_argument(name, "required argument is missing")
    }

    /// Creates a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Returns the stable kind tag for this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Auth { .. } => ErrorKind::AuthError,
            Self::Validation { .. } => ErrorKind::ValidationError,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Upstream { .. } | Self::Transport { .. } => ErrorKind::UpstreamError,
        }
    }

    /// Renders the error as the structured payload of a failed tool call.
    #[must_use]
    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "kind": self.kind(),
                "message": self.to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tags() {
        assert_eq!(
            AirtableError::missing_argument("base_id").kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            AirtableError::Auth {
                status: 403,
                message: String::new()
            }
            .kind(),
            ErrorKind::AuthError
        );
        assert_eq!(
            AirtableError::transport("connection reset").kind(),
            ErrorKind::UpstreamError
        );
        assert_eq!(
            AirtableError::Timeout { seconds: 30 }.kind(),
            ErrorKind::Timeout
        );
    }

    #[test]
    fn message_names_argument() {
        let err = AirtableError::missing_argument("table_id");
        assert!(err.to_string().contains("table_id"));
    }

    #[test]
    fn payload_carries_kind_and_message() {
        let payload = AirtableError::RateLimited { attempts: 3 }.to_payload();
        assert_eq!(payload["error"]["kind"], "RateLimited");
        assert!(payload["error"]["message"]
            .as_str()
            .unwrap()
            .contains("3 attempts"));
    }
}
