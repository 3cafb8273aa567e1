//! Airtable entities.
//!
//! Each type deserialises from Airtable's camelCase JSON and serialises into
//! the snake_case shape returned by the tools. Record field values are
//! opaque: they are carried as [`serde_json::Value`] in insertion order and
//! never interpreted.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordered mapping from field name to an opaque JSON value.
pub type FieldMap = serde_json::Map<String, Value>;

/// An Airtable base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Base {
    /// Airtable-assigned identifier (`app...`).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Access level of the token on this base.
    #[serde(
        rename(deserialize = "permissionLevel"),
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub permission_level: Option<String>,
}

/// A column definition within a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Airtable-assigned identifier (`fld...`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Field name, unique within its table.
    pub name: String,
    /// Airtable field type tag, passed through uninterpreted.
    #[serde(rename = "type")]
    pub field_type: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Type-specific options, passed through uninterpreted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
}

/// A table and its schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Airtable-assigned identifier (`tbl...`).
    pub id: String,
    /// Table name.
    pub name: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Identifier of the primary field.
    #[serde(
        rename(deserialize = "primaryFieldId"),
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub primary_field_id: Option<String>,
    /// Fields in display order.
    #[serde(default)]
    pub fields: Vec<Field>,
}

/// A single row of field values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Airtable-assigned identifier (`rec...`). Never generated locally.
    pub id: String,
    /// Creation timestamp as reported by Airtable.
    #[serde(
        rename(deserialize = "createdTime"),
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub created_time: Option<String>,
    /// Field values. Airtable omits empty fields.
    #[serde(default)]
    pub fields: FieldMap,
}

/// One page of records plus the cursor for the next page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordPage {
    /// Records on this page.
    #[serde(default)]
    pub records: Vec<Record>,
    /// Opaque continuation token; absent on the last page.
    #[serde(
        rename(deserialize = "offset"),
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub next_cursor: Option<String>,
}

/// Response body of `GET /meta/bases`.
#[derive(Debug, Deserialize)]
pub(crate) struct BasesPage {
    #[serde(default)]
    pub bases: Vec<Base>,
    #[serde(default)]
    pub offset: Option<String>,
}

/// Response body of `GET /meta/bases/{base}/tables`.
#[derive(Debug, Deserialize)]
pub(crate) struct TablesResponse {
    #[serde(default)]
    pub tables: Vec<Table>,
}

/// Response body of a multi-record create.
#[derive(Debug, Deserialize)]
pub(crate) struct RecordsResponse {
    #[serde(default)]
    pub records: Vec<Record>,
}
