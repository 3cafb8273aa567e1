//! Tool dispatcher.
//!
//! Each of the five tools validates its arguments, calls the query
//! translator and the gateway, and shapes the result. Validation failures
//! return before any request is made. Gateway errors are passed through
//! unchanged; nothing here retries.

mod args;
mod definitions;

pub use definitions::{tool_definitions, ToolDefinition};

use std::fmt;
use std::str::FromStr;

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::airtable::{AirtableError, AirtableGateway, AirtableResult, QueryArgs};

/// Accepted names for the table argument.
const TABLE_ARG: &[&str] = &["table_id", "table_id_or_name"];

/// The tools this server exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    /// `list_bases`
    ListBases,
    /// `list_tables`
    ListTables,
    /// `list_records`
    ListRecords,
    /// `create_record`
    CreateRecord,
    /// `update_record`
    UpdateRecord,
}

impl Tool {
    /// Returns the tool's wire name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ListBases => "list_bases",
            Self::ListTables => "list_tables",
            Self::ListRecords => "list_records",
            Self::CreateRecord => "create_record",
            Self::UpdateRecord => "update_record",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Tool {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "list_bases" => Ok(Self::ListBases),
            "list_tables" => Ok(Self::ListTables),
            "list_records" => Ok(Self::ListRecords),
            "create_record" => Ok(Self::CreateRecord),
            "update_record" => Ok(Self::UpdateRecord),
            _ => Err(()),
        }
    }
}

/// Routes tool calls to the gateway.
#[derive(Debug)]
pub struct ToolDispatcher {
    gateway: AirtableGateway,
}

impl ToolDispatcher {
    /// Creates a dispatcher over the given gateway.
    #[must_use]
    pub const fn new(gateway: AirtableGateway) -> Self {
        Self { gateway }
    }

    /// Runs one tool call.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for malformed input, or whatever the
    /// gateway reported.
    pub async fn dispatch(&self, tool: Tool, arguments: &Value) -> AirtableResult<Value> {
        if !(arguments.is_object() || arguments.is_null()) {
            return Err(AirtableError::invalid_argument(
                "arguments",
                "must be an object",
            ));
        }

        debug!(tool = %tool, "Dispatching tool call");
        let result = match tool {
            Tool::ListBases => self.list_bases().await,
            Tool::ListTables => self.list_tables(arguments).await,
            Tool::ListRecords => self.list_records(arguments).await,
            Tool::CreateRecord => self.create_record(arguments).await,
            Tool::UpdateRecord => self.update_record(arguments).await,
        };

        if let Err(e) = &result {
            info!(tool = %tool, kind = %e.kind(), error = %e, "Tool call failed");
        }
        result
    }

    /// `list_bases` → `{bases: [{id, name}]}`
    async fn list_bases(&self) -> AirtableResult<Value> {
        let bases = self.gateway.list_bases().await?;
        Ok(json!({ "bases": bases }))
    }

    /// `list_tables` → `{tables: [{id, name, fields: [{name, type}]}]}`
    async fn list_tables(&self, arguments: &Value) -> AirtableResult<Value> {
        let base_id = args::require_id(arguments, "base_id")?;

        let tables = self.gateway.list_tables(base_id).await?;
        Ok(json!({ "tables": tables }))
    }

    /// `list_records` → `{records: [{id, fields}], next_cursor?}`
    async fn list_records(&self, arguments: &Value) -> AirtableResult<Value> {
        let base_id = args::require_id(arguments, "base_id")?;
        let table = args::require_id_any(arguments, TABLE_ARG)?;
        let query = QueryArgs {
            filter: args::optional_filter(arguments)?,
            fields: args::optional_string_list(arguments, "fields")?,
            max_records: args::optional_i64(arguments, "max_records")?,
            page_size: args::optional_i64(arguments, "page_size")?,
            cursor: args::optional_str(arguments, "cursor")?.map(str::to_string),
        }
        .translate()?;

        let page = self.gateway.list_records(base_id, table, &query).await?;
        Ok(json!(page))
    }

    /// `create_record` → `{id, fields}`
    async fn create_record(&self, arguments: &Value) -> AirtableResult<Value> {
        let base_id = args::require_id(arguments, "base_id")?;
        let table = args::require_id_any(arguments, TABLE_ARG)?;
        let fields = args::require_field_map(arguments, "fields")?;
        let typecast = args::optional_bool(arguments, "typecast")?;

        let record = self
            .gateway
            .create_record(base_id, table, fields, typecast)
            .await?;
        info!(base_id, table, record_id = %record.id, "Created record");
        Ok(json!(record))
    }

    /// `update_record` → `{id, fields}`
    async fn update_record(&self, arguments: &Value) -> AirtableResult<Value> {
        let base_id = args::require_id(arguments, "base_id")?;
        let table = args::require_id_any(arguments, TABLE_ARG)?;
        let record_id = args::require_id(arguments, "record_id")?;
        let fields = args::require_field_map(arguments, "fields")?;
        let typecast = args::optional_bool(arguments, "typecast")?;

        let record = self
            .gateway
            .update_record(base_id, table, record_id, fields, typecast)
            .await?;
        info!(base_id, table, record_id = %record.id, "Updated record");
        Ok(json!(record))
    }
}
