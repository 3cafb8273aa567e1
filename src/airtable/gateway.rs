//! Airtable REST gateway.
//!
//! The only component that talks to the network. It builds requests for the
//! five supported endpoints, follows base pagination, retries rate-limited
//! requests and maps HTTP failures onto [`AirtableError`].
//!
//! # Retries
//!
//! - **429**: wait for `Retry-After` (or the fallback) and resend, up to
//!   [`RetryPolicy::max_attempts`] requests in total, then `RateLimited`.
//! - **5xx**: one immediate resend for idempotent methods (GET, PATCH).
//!   A POST is never resent because Airtable may already have created the
//!   record.
//! - Everything else, including timeouts, is reported at once.
//!
//! The gateway holds no mutable state, so one instance serves any number of
//! concurrent tool calls.

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::airtable::error::{AirtableError, AirtableResult};
use crate::airtable::http::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, TransportError};
use crate::airtable::query::Query;
use crate::airtable::retry::{RetryPolicy, Sleeper, TokioSleeper};
use crate::airtable::types::{
    Base, BasesPage, FieldMap, Record, RecordPage, RecordsResponse, Table, TablesResponse,
};
use crate::config::{AirtableConfig, ApiToken};
use crate::error::ConfigError;

/// Upper bound on base-list pages followed in one call.
const MAX_BASE_PAGES: usize = 100;

/// Longest raw body excerpt included in an error message.
const BODY_EXCERPT_LEN: usize = 200;

/// Client for the Airtable REST API.
pub struct AirtableGateway {
    api_url: Url,
    auth_header: HeaderValue,
    transport: Arc<dyn HttpTransport>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
}

impl std::fmt::Debug for AirtableGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AirtableGateway")
            .field("api_url", &self.api_url.as_str())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl AirtableGateway {
    /// Creates a gateway using reqwest and the Tokio timer.
    ///
    /// # Errors
    ///
    /// Returns an error if the API URL or token is unusable, or the HTTP
    /// client cannot be built.
    pub fn new(token: &ApiToken, config: &AirtableConfig) -> Result<Self, ConfigError> {
        let transport =
            ReqwestTransport::new(config.timeout()).map_err(|e| ConfigError::HttpClient {
                message: e.to_string(),
            })?;
        Self::with_transport(
            token,
            &config.api_url,
            Arc::new(transport),
            Arc::new(TokioSleeper),
            RetryPolicy::from(config),
        )
    }

    /// Creates a gateway over an arbitrary transport and sleeper.
    ///
    /// # Errors
    ///
    /// Returns an error if `api_url` is not an absolute HTTP(S) URL or the
    /// token cannot be carried in a header.
    pub fn with_transport(
        token: &ApiToken,
        api_url: &str,
        transport: Arc<dyn HttpTransport>,
        sleeper: Arc<dyn Sleeper>,
        policy: RetryPolicy,
    ) -> Result<Self, ConfigError> {
        let api_url = Url::parse(api_url.trim_end_matches('/')).map_err(|e| {
            ConfigError::ValidationError {
                message: format!("Invalid api_url '{api_url}': {e}"),
            }
        })?;
        if api_url.cannot_be_a_base() {
            return Err(ConfigError::ValidationError {
                message: format!("Invalid api_url '{api_url}': not a base URL"),
            });
        }

        let mut auth_header = HeaderValue::from_str(&format!("Bearer {}", token.expose()))
            .map_err(|_| ConfigError::ValidationError {
                message: "Airtable token contains characters not allowed in an HTTP header"
                    .to_string(),
            })?;
        auth_header.set_sensitive(true);

        Ok(Self {
            api_url,
            auth_header,
            transport,
            sleeper,
            policy,
        })
    }

    /// Lists every base the token can access, following pagination.
    ///
    /// # Errors
    ///
    /// Returns the mapped error of the first failing page.
    pub async fn list_bases(&self) -> AirtableResult<Vec<Base>> {
        let mut bases = Vec::new();
        let mut offset: Option<String> = None;

        for page_number in 1..=MAX_BASE_PAGES {
            let params: Vec<(String, String)> = offset
                .iter()
                .map(|o| ("offset".to_string(), o.clone()))
                .collect();
            let url = self.url(&["meta", "bases"], &params)?;
            let page: BasesPage = self.execute(Method::GET, url, None).await?;

            debug!(page = page_number, count = page.bases.len(), "Fetched bases page");
            bases.extend(page.bases);

            match page.offset {
                Some(next) if offset.as_deref() == Some(next.as_str()) => {
                    return Err(AirtableError::transport(
                        "Airtable returned the same base-list cursor twice",
                    ));
                }
                Some(next) => offset = Some(next),
                None => return Ok(bases),
            }
        }

        Err(AirtableError::transport(format!(
            "base list exceeded {MAX_BASE_PAGES} pages"
        )))
    }

    /// Lists the tables of a base with their field schemas.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown base, or any other mapped error.
    pub async fn list_tables(&self, base_id: &str) -> AirtableResult<Vec<Table>> {
        let url = self.url(&["meta", "bases", base_id, "tables"], &[])?;
        let response: TablesResponse = self.execute(Method::GET, url, None).await?;
        Ok(response.tables)
    }

    /// Fetches one page of records.
    ///
    /// Pagination is not followed; the returned cursor is handed back to the
    /// caller unchanged.
    ///
    /// # Errors
    ///
    /// Returns the mapped error of the request.
    pub async fn list_records(
        &self,
        base_id: &str,
        table: &str,
        query: &Query,
    ) -> AirtableResult<RecordPage> {
        let url = self.url(&[base_id, table], &query.to_params())?;
        debug!(base_id, table, query = %query.describe(), "Listing records");
        self.execute(Method::GET, url, None).await
    }

    /// Creates a single record.
    ///
    /// # Errors
    ///
    /// Returns the mapped error of the request, or an upstream error if
    /// Airtable answers without a record.
    pub async fn create_record(
        &self,
        base_id: &str,
        table: &str,
        fields: FieldMap,
        typecast: bool,
    ) -> AirtableResult<Record> {
        let mut body = json!({ "records": [{ "fields": fields }] });
        if typecast {
            body["typecast"] = Value::Bool(true);
        }

        let url = self.url(&[base_id, table], &[])?;
        let response: RecordsResponse = self.execute(Method::POST, url, Some(body)).await?;
        response
            .records
            .into_iter()
            .next()
            .ok_or_else(|| AirtableError::transport("create succeeded but no record was returned"))
    }

    /// Applies a partial update to a record. Omitted fields are untouched.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown record, or any other mapped error.
    pub async fn update_record(
        &self,
        base_id: &str,
        table: &str,
        record_id: &str,
        fields: FieldMap,
        typecast: bool,
    ) -> AirtableResult<Record> {
        let mut body = json!({ "fields": fields });
        if typecast {
            body["typecast"] = Value::Bool(true);
        }

        let url = self.url(&[base_id, table, record_id], &[])?;
        self.execute(Method::PATCH, url, Some(body)).await
    }

    /// Joins percent-encoded path segments and query pairs onto the API root.
    ///
    /// `.` and `..` are refused: the URL parser would drop them and the
    /// request would reach a different endpoint.
    fn url(&self, segments: &[&str], params: &[(String, String)]) -> AirtableResult<Url> {
        if let Some(dot) = segments.iter().find(|s| matches!(**s, "." | "..")) {
            return Err(AirtableError::invalid_argument(
                "path",
                format!("'{dot}' is not a valid identifier"),
            ));
        }

        let mut url = self.api_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }

    fn build_request(&self, method: Method, url: Url, body: Option<Value>) -> HttpRequest {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, self.auth_header.clone());
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        HttpRequest {
            method,
            url,
            headers,
            body,
        }
    }

    /// Sends a request, applying the retry policy, and decodes the body.
    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<Value>,
    ) -> AirtableResult<T> {
        let idempotent = method != Method::POST;
        let path = url.path().to_string();
        let request = self.build_request(method, url, body);

        let mut attempts: u32 = 0;
        let mut rate_limited: u32 = 0;
        let mut server_retry_used = false;

        loop {
            attempts += 1;
            debug!(method = %request.method, path = %path, attempt = attempts, "Sending Airtable request");

            let response = match self.transport.send(request.clone()).await {
                Ok(response) => response,
                Err(TransportError::Timeout) => {
                    warn!(path = %path, "Airtable request timed out");
                    return Err(AirtableError::Timeout {
                        seconds: self.policy.timeout.as_secs(),
                    });
                }
                Err(TransportError::Failed(message)) => {
                    warn!(path = %path, error = %message, "Airtable request failed");
                    return Err(AirtableError::transport(message));
                }
            };

            let status = response.status;
            if status.is_success() {
                return serde_json::from_str(&response.body).map_err(|e| {
                    AirtableError::transport(format!("unexpected response body: {e}"))
                });
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                rate_limited += 1;
                if rate_limited >= self.policy.max_attempts {
                    warn!(path = %path, attempts, "Rate limit retry budget exhausted");
                    return Err(AirtableError::RateLimited { attempts });
                }
                let wait = self.policy.rate_limit_wait(&response.headers);
                warn!(
                    path = %path,
                    attempt = attempts,
                    wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                    "Rate limited by Airtable, backing off"
                );
                self.sleeper.sleep(wait).await;
                continue;
            }

            if status.is_server_error() && idempotent && !server_retry_used {
                server_retry_used = true;
                warn!(path = %path, status = status.as_u16(), "Airtable server error, retrying once");
                continue;
            }

            return Err(map_status(&response));
        }
    }
}

/// Maps a non-success response to the error vocabulary.
pub(crate) fn map_status(response: &HttpResponse) -> AirtableError {
    let status = response.status.as_u16();
    let detail = airtable_message(&response.body);

    match response.status {
        StatusCode::UNAUTHORIZED => AirtableError::Auth {
            status,
            message: detail.unwrap_or_else(|| {
                "Invalid API key. Check your AIRTABLE_API_KEY.".to_string()
            }),
        },
        StatusCode::FORBIDDEN => AirtableError::Auth {
            status,
            message: detail.unwrap_or_else(|| {
                "Permission denied. Your token lacks access to this resource.".to_string()
            }),
        },
        StatusCode::NOT_FOUND => AirtableError::NotFound {
            message: detail.unwrap_or_else(|| {
                "Check that the base/table/record ID is correct.".to_string()
            }),
        },
        StatusCode::UNPROCESSABLE_ENTITY => AirtableError::Validation {
            message: detail.unwrap_or_else(|| "Unknown error".to_string()),
        },
        StatusCode::TOO_MANY_REQUESTS => AirtableError::RateLimited { attempts: 1 },
        _ => AirtableError::Upstream {
            status,
            message: detail.unwrap_or_else(|| excerpt(&response.body)),
        },
    }
}

/// Extracts Airtable's explanation from an error body.
///
/// Understands both `{"error": {"type": .., "message": ..}}` and
/// `{"error": "TYPE"}`.
fn airtable_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("error")? {
        Value::String(kind) => Some(kind.clone()),
        Value::Object(obj) => {
            let kind = obj.get("type").and_then(Value::as_str);
            let message = obj.get("message").and_then(Value::as_str);
            match (kind, message) {
                (Some(k), Some(m)) => Some(format!("{m} ({k})")),
                (None, Some(m)) => Some(m.to_string()),
                (Some(k), None) => Some(k.to_string()),
                (None, None) => None,
            }
        }
        _ => None,
    }
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }
    match trimmed.char_indices().nth(BODY_EXCERPT_LEN) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
