//! Tool definitions advertised through `tools/list`.

use serde::Serialize;
use serde_json::{json, Value};

/// A tool definition for tools/list response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: Value,
}

fn base_id_schema() -> Value {
    json!({
        "type": "string",
        "description": "The base ID (starts with 'app', e.g. 'appABC123')"
    })
}

fn table_id_schema() -> Value {
    json!({
        "type": "string",
        "description": "Table ID (starts with 'tbl') or table name"
    })
}

fn table_alias_schema() -> Value {
    json!({
        "type": "string",
        "description": "Alternative name for table_id; give one of the two"
    })
}

/// Either table argument satisfies the table requirement.
fn table_required() -> Value {
    json!([
        { "required": ["table_id"] },
        { "required": ["table_id_or_name"] }
    ])
}

fn fields_map_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "description": description,
        "minProperties": 1,
        "additionalProperties": true
    })
}

fn typecast_schema() -> Value {
    json!({
        "type": "boolean",
        "description": "Optional: let Airtable convert string values to the field's type (default: false)"
    })
}

/// Returns the five Airtable tools.
#[allow(clippy::too_many_lines)]
#[must_use]
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "list_bases".to_string(),
            description: Some(
                "List all Airtable bases accessible to the configured token. \
                 Returns each base's ID and name. Use the base ID in list_tables \
                 and the record tools."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
        },
        ToolDefinition {
            name: "list_tables".to_string(),
            description: Some(
                "List all tables in an Airtable base with their field definitions \
                 (name and type). Use the table ID or name in the record tools."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "base_id": base_id_schema()
                },
                "required": ["base_id"]
            }),
        },
        ToolDefinition {
            name: "list_records".to_string(),
            description: Some(
                "List one page of records from an Airtable table. Returns records with \
                 their ID and field values, plus next_cursor when more records exist. \
                 Pass next_cursor back as cursor (unchanged) to fetch the next page. \
                 Filter with an Airtable formula such as \"{Status}='Done'\" or a \
                 structured condition {\"field\": \"Status\", \"op\": \"eq\", \"value\": \"Done\"}."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "base_id": base_id_schema(),
                    "table_id": table_id_schema(),
                    "table_id_or_name": table_alias_schema(),
                    "filter": {
                        "description": "Optional: Airtable formula string, or {field, op, value} \
                                        with op one of eq, neq, gt, gte, lt, lte, contains",
                        "oneOf": [
                            { "type": "string" },
                            {
                                "type": "object",
                                "properties": {
                                    "field": { "type": "string" },
                                    "op": {
                                        "type": "string",
                                        "enum": ["eq", "neq", "gt", "gte", "lt", "lte", "contains"]
                                    },
                                    "value": {}
                                },
                                "required": ["field", "op", "value"]
                            }
                        ]
                    },
                    "fields": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Optional: only return these fields"
                    },
                    "max_records": {
                        "type": "integer",
                        "minimum": 1,
                        "description": "Optional: maximum number of records to return in total"
                    },
                    "page_size": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": 100,
                        "description": "Optional: records per page (Airtable default: 100)"
                    },
                    "filter_formula": {
                        "type": "string",
                        "description": "Optional: Airtable formula string; alternative to a \
                                        string filter, do not pass both"
                    },
                    "cursor": {
                        "type": "string",
                        "description": "Optional: next_cursor from a previous list_records call"
                    }
                },
                "required": ["base_id"],
                "anyOf": table_required()
            }),
        },
        ToolDefinition {
            name: "create_record".to_string(),
            description: Some(
                "Create a new record in an Airtable table. Returns the created record \
                 with its new ID and field values. If the call times out the record \
                 may still have been created; list records before retrying."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "base_id": base_id_schema(),
                    "table_id": table_id_schema(),
                    "table_id_or_name": table_alias_schema(),
                    "fields": fields_map_schema(
                        "Mapping of field names to values, e.g. {\"Name\": \"New Task\", \"Status\": \"Pending\"}"
                    ),
                    "typecast": typecast_schema()
                },
                "required": ["base_id", "fields"],
                "anyOf": table_required()
            }),
        },
        ToolDefinition {
            name: "update_record".to_string(),
            description: Some(
                "Update an existing record in an Airtable table. Only the given fields \
                 are changed; all other fields keep their values. Returns the updated record."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "base_id": base_id_schema(),
                    "table_id": table_id_schema(),
                    "table_id_or_name": table_alias_schema(),
                    "record_id": {
                        "type": "string",
                        "description": "The record ID to update (starts with 'rec')"
                    },
                    "fields": fields_map_schema(
                        "Mapping of field names to new values, e.g. {\"Status\": \"Done\"}"
                    ),
                    "typecast": typecast_schema()
                },
                "required": ["base_id", "record_id", "fields"],
                "anyOf": table_required()
            }),
        },
    ]
}
