//! HTTP seam between the gateway and the network.
//!
//! The gateway builds [`HttpRequest`] values and hands them to an
//! [`HttpTransport`]. Production uses [`ReqwestTransport`]; tests substitute
//! a scripted transport so status handling and retries can be exercised
//! without a network.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};
use reqwest::{Method, StatusCode, Url};
use serde_json::Value;
use thiserror::Error;

/// An outbound request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: Method,
    /// Fully-built URL including the query string.
    pub url: Url,
    /// Request headers, including `Authorization`.
    pub headers: HeaderMap,
    /// Optional JSON body.
    pub body: Option<Value>,
}

/// A received response with its body fully read.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Body text.
    pub body: String,
}

impl HttpResponse {
    /// Creates a response with no headers.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Adds a `Retry-After` header.
    #[must_use]
    pub fn with_retry_after(mut self, value: &str) -> Self {
        if let Ok(v) = HeaderValue::from_str(value) {
            self.headers.insert(RETRY_AFTER, v);
        }
        self
    }
}

/// Failures below the HTTP status level.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The exchange exceeded its deadline.
    #[error("request timed out")]
    Timeout,

    /// The request could not be sent or the body not read.
    #[error("request failed: {0}")]
    Failed(String),
}

/// Sends HTTP requests.
///
/// Implementations must be safe to call concurrently.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Performs one exchange. Never retries.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// [`HttpTransport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a transport whose every request is bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("airtable-mcp/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await.map_err(map_reqwest_error)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else {
        // Strip the URL so logs never carry query strings.
        TransportError::Failed(e.without_url().to_string())
    }
}
