//! MCP server implementation for Airtable.
//!
//! This module implements the MCP server lifecycle:
//!
//! 1. **Initialisation**: Capability negotiation and version agreement
//! 2. **Operation**: Handling tool calls and other requests
//! 3. **Shutdown**: Graceful connection termination
//!
//! # Concurrency
//!
//! Every `tools/call` runs as its own Tokio task, so a slow or rate-limited
//! call never blocks the others. Results are written in completion order.
//! A `notifications/cancelled` aborts the matching task, which drops its
//! in-flight HTTP request; no response is written for it. A cancelled
//! create or update may already have been applied by Airtable.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use crate::airtable::{AirtableError, AirtableResult};
use crate::mcp::protocol::{
    ErrorCode, IncomingMessage, JsonRpcError, JsonRpcErrorData, JsonRpcNotification,
    JsonRpcRequest, JsonRpcResponse, OutgoingMessage, RequestId, MCP_PROTOCOL_VERSION,
    SERVER_NAME,
};
use crate::mcp::transport::{LineTransport, StdioTransport};
use crate::tools::{tool_definitions, Tool, ToolDispatcher};

/// Server state in the MCP lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Waiting for initialize request.
    AwaitingInit,
    /// Initialize received, waiting for initialized notification.
    Initialising,
    /// Ready for normal operation.
    Running,
    /// Shutdown in progress.
    ShuttingDown,
}

/// Server capabilities advertised during initialisation.
#[derive(Debug, Clone, Serialize)]
pub struct ServerCapabilities {
    /// Tool-related capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolCapabilities>,
}

impl Default for ServerCapabilities {
    fn default() -> Self {
        Self {
            tools: Some(ToolCapabilities::default()),
        }
    }
}

/// Tool-specific capabilities.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolCapabilities {
    /// Whether the tool list can change during the session.
    #[serde(rename = "listChanged", skip_serializing_if = "is_false")]
    pub list_changed: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde's skip_serializing_if requires a predicate fn(&T) -> bool, so we must take &bool here
const fn is_false(b: &bool) -> bool {
    !*b
}

/// Server information for initialisation response.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Client information received during initialisation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    #[serde(default)]
    pub version: Option<String>,
}

/// Parameters for the initialize request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version requested by client.
    pub protocol_version: String,
    /// Client capabilities.
    #[serde(default)]
    pub capabilities: Value,
    /// Client information.
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

/// Parameters for tools/call request.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    /// Name of the tool to call.
    pub name: String,
    /// Arguments for the tool.
    #[serde(default)]
    pub arguments: Value,
}

/// Content item in a tool call response.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

/// Result of a tool call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
    /// Whether the tool call resulted in an error.
    #[serde(skip_serializing_if = "is_false")]
    pub is_error: bool,
}

impl ToolCallResult {
    /// Creates a successful text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Creates an error text result.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: message.into(),
            }],
            is_error: true,
        }
    }

    /// Renders a tool outcome: the value on success, the kind-tagged
    /// error payload on failure.
    #[must_use]
    pub fn from_outcome(outcome: &AirtableResult<Value>) -> Self {
        match outcome {
            Ok(value) => Self::text(pretty(value)),
            Err(e) => Self::error(pretty(&e.to_payload())),
        }
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// A finished tool call on its way back to the writer.
struct Completion {
    id: RequestId,
    seq: u64,
    message: OutgoingMessage,
}

/// The MCP server for Airtable.
pub struct McpServer<R = tokio::io::BufReader<tokio::io::Stdin>, W = tokio::io::Stdout> {
    /// Current server state.
    state: ServerState,
    /// The transport layer.
    transport: LineTransport<R, W>,
    /// Negotiated protocol version (set after initialisation).
    protocol_version: Option<String>,
    /// Tool handlers, shared with in-flight tasks.
    dispatcher: Arc<ToolDispatcher>,
    /// In-flight tool calls by request ID.
    in_flight: HashMap<RequestId, (u64, AbortHandle)>,
    /// Sequence number of the next tool call.
    next_seq: u64,
    /// Set once the input stream reaches EOF.
    input_closed: bool,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
}

impl McpServer {
    /// Creates a new MCP server on stdio.
    #[must_use]
    pub fn new(dispatcher: ToolDispatcher) -> Self {
        Self::with_transport(dispatcher, StdioTransport::stdio())
    }
}

impl<R, W> McpServer<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a new MCP server over the given transport.
    #[must_use]
    pub fn with_transport(dispatcher: ToolDispatcher, transport: LineTransport<R, W>) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            state: ServerState::AwaitingInit,
            transport,
            protocol_version: None,
            dispatcher: Arc::new(dispatcher),
            in_flight: HashMap::new(),
            next_seq: 0,
            input_closed: false,
            completions_tx,
            completions_rx,
        }
    }

    /// Returns the current server state.
    #[must_use]
    pub const fn state(&self) -> ServerState {
        self.state
    }

    /// Returns the negotiated protocol version, once initialised.
    #[must_use]
    pub fn protocol_version(&self) -> Option<&str> {
        self.protocol_version.as_deref()
    }

    /// Returns the number of tool calls still running.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Consumes the server, returning the transport's writer.
    pub fn into_writer(self) -> W {
        self.transport.into_writer()
    }

    /// Runs the MCP server main loop with graceful shutdown handling.
    ///
    /// Returns after a shutdown signal, or after input EOF once every
    /// in-flight tool call has been answered.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn run(&mut self) -> std::io::Result<()> {
        let mut shutdown = ShutdownSignal::new()?;

        loop {
            if self.input_closed && self.in_flight.is_empty() {
                self.state = ServerState::ShuttingDown;
                return Ok(());
            }

            tokio::select! {
                signal = shutdown.recv() => {
                    tracing::info!(signal, "Received shutdown signal, initiating graceful shutdown");
                    self.abort_all();
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                line_result = self.transport.read_line(), if !self.input_closed => {
                    self.handle_transport_result(line_result).await?;
                }

                Some(completion) = self.completions_rx.recv() => {
                    self.deliver(completion).await?;
                }
            }
        }
    }

    /// Handles the result from transport read.
    async fn handle_transport_result(
        &mut self,
        line_result: std::io::Result<Option<String>>,
    ) -> std::io::Result<()> {
        let Some(line) = line_result? else {
            tracing::info!(pending = self.in_flight.len(), "Input closed");
            self.input_closed = true;
            return Ok(());
        };

        if line.trim().is_empty() {
            return Ok(());
        }

        self.handle_line(&line).await
    }

    /// Handles a single line of input.
    async fn handle_line(&mut self, line: &str) -> std::io::Result<()> {
        use crate::mcp::protocol::parse_message;

        match parse_message(line) {
            Ok(msg) => self.handle_message(msg).await,
            Err(error) => self.transport.write_message(&error.into()).await,
        }
    }

    /// Handles a parsed incoming message.
    async fn handle_message(&mut self, msg: IncomingMessage) -> std::io::Result<()> {
        match msg {
            IncomingMessage::Request(req) => self.handle_request(req).await,
            IncomingMessage::Notification(ref notif) => {
                self.handle_notification(notif);
                Ok(())
            }
        }
    }

    /// Handles an incoming request.
    ///
    /// `tools/call` is answered later, when its task completes.
    async fn handle_request(&mut self, req: JsonRpcRequest) -> std::io::Result<()> {
        let response = match req.method.as_str() {
            "initialize" => self.handle_initialize(&req),
            "tools/list" => self.handle_tools_list(&req),
            "tools/call" => match self.spawn_tool_call(&req) {
                Ok(()) => return Ok(()),
                Err(error) => Err(error),
            },
            "ping" => Ok(Self::handle_ping(&req)),
            _ => Err(JsonRpcError::method_not_found(req.id.clone(), &req.method)),
        };

        let message = match response {
            Ok(resp) => resp.into(),
            Err(error) => error.into(),
        };
        self.transport.write_message(&message).await
    }

    /// Handles an incoming notification.
    fn handle_notification(&mut self, notif: &JsonRpcNotification) {
        if notif.method == "notifications/initialized" && self.state == ServerState::Initialising {
            self.state = ServerState::Running;
            return;
        }

        if let Some(cancel) = notif.cancelled_params() {
            if let Some((_, handle)) = self.in_flight.remove(&cancel.request_id) {
                handle.abort();
                tracing::info!(
                    request_id = %cancel.request_id,
                    reason = cancel.reason.as_deref().unwrap_or("unspecified"),
                    "Cancelled tool call"
                );
            }
        }
    }

    /// Handles the initialize request.
    fn handle_initialize(&mut self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        if self.state != ServerState::AwaitingInit {
            return Err(JsonRpcError::new(
                Some(req.id.clone()),
                JsonRpcErrorData::with_message(
                    ErrorCode::InvalidRequest,
                    "Server already initialised",
                ),
            ));
        }

        let params: InitializeParams = req
            .params
            .as_ref()
            .map(|p| serde_json::from_value(p.clone()))
            .transpose()
            .map_err(|e| {
                JsonRpcError::invalid_params(
                    req.id.clone(),
                    format!("Invalid initialize params: {e}"),
                )
            })?
            .ok_or_else(|| {
                JsonRpcError::invalid_params(req.id.clone(), "Missing initialize params")
            })?;

        tracing::info!(
            client = params.client_info.as_ref().map_or("unknown", |c| c.name.as_str()),
            requested_version = %params.protocol_version,
            "Client initialising"
        );

        let negotiated_version = MCP_PROTOCOL_VERSION.to_string();

        self.protocol_version = Some(negotiated_version.clone());
        self.state = ServerState::Initialising;

        let result = json!({
            "protocolVersion": negotiated_version,
            "capabilities": ServerCapabilities::default(),
            "serverInfo": ServerInfo::default(),
        });

        Ok(JsonRpcResponse::success(req.id.clone(), result))
    }

    /// Handles the tools/list request.
    fn handle_tools_list(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;

        let result = json!({
            "tools": tool_definitions(),
        });

        Ok(JsonRpcResponse::success(req.id.clone(), result))
    }

    /// Validates a tools/call request and starts its task.
    fn spawn_tool_call(&mut self, req: &JsonRpcRequest) -> Result<(), JsonRpcError> {
        self.require_running(&req.id)?;

        let params: ToolCallParams = req
            .params
            .as_ref()
            .map(|p| serde_json::from_value(p.clone()))
            .transpose()
            .map_err(|e| {
                JsonRpcError::invalid_params(
                    req.id.clone(),
                    format!("Invalid tool call params: {e}"),
                )
            })?
            .ok_or_else(|| {
                JsonRpcError::invalid_params(req.id.clone(), "Missing tool call params")
            })?;

        if self.in_flight.contains_key(&req.id) {
            return Err(JsonRpcError::new(
                Some(req.id.clone()),
                JsonRpcErrorData::with_message(
                    ErrorCode::InvalidRequest,
                    format!("Request ID {} is already in use", req.id),
                ),
            ));
        }

        let seq = self.next_seq;
        self.next_seq += 1;

        let id = req.id.clone();
        let dispatcher = Arc::clone(&self.dispatcher);
        let completions = self.completions_tx.clone();

        let handle = tokio::spawn(async move {
            let outcome = match params.name.parse::<Tool>() {
                Ok(tool) => dispatcher.dispatch(tool, &params.arguments).await,
                Err(()) => Err(AirtableError::invalid_argument(
                    "name",
                    format!("Unknown tool: {}", params.name),
                )),
            };
            let message = tool_call_message(id.clone(), &outcome);
            // The receiver only disappears when the server is gone.
            let _ = completions.send(Completion { id, seq, message });
        });

        self.in_flight
            .insert(req.id.clone(), (seq, handle.abort_handle()));
        Ok(())
    }

    /// Writes a finished tool call unless it was cancelled meanwhile.
    async fn deliver(&mut self, completion: Completion) -> std::io::Result<()> {
        match self.in_flight.get(&completion.id) {
            Some((seq, _)) if *seq == completion.seq => {
                self.in_flight.remove(&completion.id);
                self.transport.write_message(&completion.message).await
            }
            _ => {
                tracing::debug!(request_id = %completion.id, "Dropping result of cancelled tool call");
                Ok(())
            }
        }
    }

    fn abort_all(&mut self) {
        for (id, (_, handle)) in self.in_flight.drain() {
            tracing::debug!(request_id = %id, "Aborting in-flight tool call");
            handle.abort();
        }
    }

    /// Handles the ping request.
    fn handle_ping(req: &JsonRpcRequest) -> JsonRpcResponse {
        JsonRpcResponse::success(req.id.clone(), json!({}))
    }

    /// Ensures the server is in the Running state.
    fn require_running(&self, id: &RequestId) -> Result<(), JsonRpcError> {
        if self.state != ServerState::Running {
            return Err(JsonRpcError::new(
                Some(id.clone()),
                JsonRpcErrorData::with_message(ErrorCode::InvalidRequest, "Server not initialised"),
            ));
        }
        Ok(())
    }
}

/// Builds the JSON-RPC response for a finished tool call.
fn tool_call_message(id: RequestId, outcome: &AirtableResult<Value>) -> OutgoingMessage {
    let result = ToolCallResult::from_outcome(outcome);
    match serde_json::to_value(&result) {
        Ok(value) => JsonRpcResponse::success(id, value).into(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialise tool call result");
            JsonRpcError::internal_error(id, "Internal error: failed to serialise result").into()
        }
    }
}

/// Process termination signals.
struct ShutdownSignal {
    #[cfg(unix)]
    sigint: tokio::signal::unix::Signal,
    #[cfg(unix)]
    sigterm: tokio::signal::unix::Signal,
}

impl ShutdownSignal {
    #[cfg(unix)]
    fn new() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            sigint: signal(SignalKind::interrupt())?,
            sigterm: signal(SignalKind::terminate())?,
        })
    }

    #[cfg(windows)]
    #[allow(clippy::unnecessary_wraps)]
    fn new() -> std::io::Result<Self> {
        Ok(Self {})
    }

    /// Waits for the next signal and returns its name.
    #[cfg(unix)]
    async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.sigint.recv() => "SIGINT",
            _ = self.sigterm.recv() => "SIGTERM",
        }
    }

    /// Waits for the next signal and returns its name.
    #[cfg(windows)]
    async fn recv(&mut self) -> &'static str {
        let _ = tokio::signal::ctrl_c().await;
        "Ctrl+C"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::airtable::ErrorKind;

    #[test]
    fn tool_call_result_text() {
        let result = ToolCallResult::text("Hello, world!");
        assert!(!result.is_error);
        assert_eq!(result.content.len(), 1);

        match &result.content[0] {
            ToolContent::Text { text } => assert_eq!(text, "Hello, world!"),
        }
    }

    #[test]
    fn tool_call_result_error() {
        let result = ToolCallResult::error("Something went wrong");
        assert!(result.is_error);
        assert_eq!(result.content.len(), 1);
    }

    #[test]
    fn outcome_error_is_kind_tagged() {
        let outcome: AirtableResult<Value> = Err(AirtableError::NotFound {
            message: "no such base".to_string(),
        });
        let result = ToolCallResult::from_outcome(&outcome);
        assert!(result.is_error);

        let ToolContent::Text { text } = &result.content[0];
        let payload: Value = serde_json::from_str(text).unwrap();
        assert_eq!(payload["error"]["kind"], ErrorKind::NotFound.as_str());
    }

    #[test]
    fn outcome_success_is_json_text() {
        let outcome: AirtableResult<Value> = Ok(json!({"bases": []}));
        let result = ToolCallResult::from_outcome(&outcome);
        assert!(!result.is_error);

        let value = serde_json::to_value(&result).unwrap();
        assert!(value.get("isError").is_none());
        assert_eq!(value["content"][0]["type"], "text");
    }

    #[test]
    fn message_wraps_result() {
        let message = tool_call_message(RequestId::Number(9), &Ok(json!({"ok": true})));
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["id"], 9);
        assert!(json["result"]["content"].is_array());
    }
}
