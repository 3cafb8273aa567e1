//! Shared fixtures: a scripted HTTP transport and a recording sleeper.
//!
//! Nothing here touches the network or the wall clock.

#![allow(dead_code)]

pub mod fake_airtable;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use airtable_mcp::airtable::{
    AirtableGateway, HttpRequest, HttpResponse, HttpTransport, RetryPolicy, Sleeper,
    TransportError,
};
use airtable_mcp::config::ApiToken;
use airtable_mcp::tools::ToolDispatcher;

pub const API_URL: &str = "https://api.airtable.com/v0";
pub const TOKEN: &str = "patTEST.secret";

/// One scripted reaction of the fake transport.
pub enum Step {
    /// Answer with this response.
    Respond(HttpResponse),
    /// Fail as if the deadline passed.
    Timeout,
    /// Fail as if the connection broke.
    Fail(&'static str),
    /// Never answer.
    Hang,
}

/// `200 OK` with a JSON body.
pub fn ok(body: &Value) -> Step {
    Step::Respond(HttpResponse::new(200, body.to_string()))
}

/// Arbitrary status with a raw body.
pub fn status(code: u16, body: &str) -> Step {
    Step::Respond(HttpResponse::new(code, body))
}

/// `429` with an optional `Retry-After`.
pub fn too_many_requests(retry_after: Option<&str>) -> Step {
    let response = HttpResponse::new(429, r#"{"errors":[{"error":"RATE_LIMIT_REACHED"}]}"#);
    Step::Respond(match retry_after {
        Some(v) => response.with_retry_after(v),
        None => response,
    })
}

/// Replays a fixed script and records every request it receives.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<HttpRequest>>,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Step>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    /// Number of requests sent so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Copies of every request sent so far.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Values of one query parameter of the `n`th request.
    pub fn query_values(&self, n: usize, key: &str) -> Vec<String> {
        self.requests()[n]
            .url
            .query_pairs()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
            .collect()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);

        let step = self.script.lock().unwrap().pop_front();
        match step {
            Some(Step::Respond(response)) => Ok(response),
            Some(Step::Timeout) => Err(TransportError::Timeout),
            Some(Step::Fail(message)) => Err(TransportError::Failed(message.to_string())),
            Some(Step::Hang) => std::future::pending().await,
            None => Err(TransportError::Failed("unscripted request".to_string())),
        }
    }
}

/// Records requested waits and returns immediately.
#[derive(Default)]
pub struct RecordingSleeper {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
    }
}

/// A gateway over a scripted transport with the default retry policy.
pub struct Harness {
    pub transport: Arc<ScriptedTransport>,
    pub sleeper: Arc<RecordingSleeper>,
}

impl Harness {
    pub fn new(script: Vec<Step>) -> Self {
        Self {
            transport: Arc::new(ScriptedTransport::new(script)),
            sleeper: Arc::new(RecordingSleeper::default()),
        }
    }

    pub fn gateway(&self) -> AirtableGateway {
        let token = ApiToken::new(TOKEN).unwrap();
        AirtableGateway::with_transport(
            &token,
            API_URL,
            self.transport.clone(),
            self.sleeper.clone(),
            RetryPolicy::default(),
        )
        .unwrap()
    }

    pub fn dispatcher(&self) -> ToolDispatcher {
        ToolDispatcher::new(self.gateway())
    }
}
