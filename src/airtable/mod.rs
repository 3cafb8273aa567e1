//! Airtable REST API access.
//!
//! # Layout
//!
//! - [`query`]: pure translation of tool arguments into list-records queries
//! - [`gateway`]: HTTP calls, pagination, rate-limit backoff, error mapping
//! - [`http`] / [`retry`]: the transport and sleep seams the gateway is
//!   built over
//! - [`types`]: bases, tables, fields and records
//! - [`error`]: the error vocabulary reported to the calling agent

pub mod error;
pub mod gateway;
pub mod http;
pub mod query;
pub mod retry;
pub mod types;

pub use error::{AirtableError, AirtableResult, ErrorKind};
pub use gateway::AirtableGateway;
pub use http::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, TransportError};
pub use query::{Comparison, ComparisonOp, Filter, Query, QueryArgs};
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
pub use types::{Base, Field, FieldMap, Record, RecordPage, Table};
