//! airtable-mcp: MCP server exposing Airtable to AI assistants
//!
//! This library translates MCP tool calls into Airtable REST API requests
//! and maps the responses and failures back into tool results.
//!
//! # Architecture
//!
//! The MCP server exposes five tools. The AI decides which to call:
//!
//! - **`list_bases`** / **`list_tables`**: discover bases and table schemas
//! - **`list_records`**: page through records with filters and field selection
//! - **`create_record`** / **`update_record`**: write single records
//!
//! Nothing is cached between calls; each tool call is an independent REST
//! exchange.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading and the API token
//! - [`error`]: Startup error types
//! - [`airtable`]: Query translation and the REST gateway
//! - [`tools`]: Tool argument validation and dispatch
//! - [`mcp`]: MCP protocol implementation

pub mod airtable;
pub mod config;
pub mod error;
pub mod mcp;
pub mod tools;
