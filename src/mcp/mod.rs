//! Model Context Protocol (MCP) server implementation.
//!
//! This module implements the MCP specification for exposing Airtable
//! operations as tools to AI assistants. The server communicates over stdio
//! transport using JSON-RPC 2.0 messages.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          MCP Server                          │
//! │                                                              │
//! │   ┌─────────────┐    ┌─────────────┐    ┌────────────────┐   │
//! │   │  Transport  │───▶│   Server    │───▶│ Tool Dispatcher│   │
//! │   │   (stdio)   │◀───│ (lifecycle) │◀───│  (one task per │   │
//! │   └─────────────┘    └─────────────┘    │   tools/call)  │   │
//! │                                         └───────┬────────┘   │
//! │                                                 ▼            │
//! │                                         ┌────────────────┐   │
//! │                                         │ Airtable REST  │   │
//! │                                         │    Gateway     │   │
//! │                                         └────────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! This implementation targets MCP protocol version 2024-11-05.

pub mod protocol;
pub mod server;
pub mod transport;

pub use protocol::{
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, OutgoingMessage, MCP_PROTOCOL_VERSION,
};
pub use server::McpServer;
pub use transport::{LineTransport, StdioTransport};
