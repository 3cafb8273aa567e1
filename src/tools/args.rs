//! Typed extraction of tool arguments.
//!
//! Every helper fails with [`AirtableError::InvalidArgument`] naming the
//! offending argument, so validation never reaches the network.

use serde_json::Value;

use crate::airtable::{AirtableError, AirtableResult, Comparison, FieldMap, Filter};

/// Returns a required, non-blank string argument.
pub fn require_str<'a>(args: &'a Value, name: &str) -> AirtableResult<&'a str> {
    optional_str(args, name)?.ok_or_else(|| AirtableError::missing_argument(name))
}

/// Returns the first present of several accepted names for one argument.
///
/// The first name is the canonical one reported in errors.
pub fn require_str_any<'a>(args: &'a Value, names: &[&str]) -> AirtableResult<&'a str> {
    for name in names {
        if let Some(value) = optional_str(args, name)? {
            return Ok(value);
        }
    }
    Err(AirtableError::missing_argument(
        names.first().copied().unwrap_or("argument"),
    ))
}

/// Returns a required identifier that becomes a URL path segment.
pub fn require_id<'a>(args: &'a Value, name: &str) -> AirtableResult<&'a str> {
    path_segment(name, require_str(args, name)?)
}

/// [`require_id`] for an argument with several accepted names.
pub fn require_id_any<'a>(args: &'a Value, names: &[&str]) -> AirtableResult<&'a str> {
    let value = require_str_any(args, names)?;
    path_segment(names.first().copied().unwrap_or("argument"), value)
}

/// Rejects `.` and `..`, which URL normalisation would drop from the path.
fn path_segment<'a>(name: &str, value: &'a str) -> AirtableResult<&'a str> {
    if matches!(value, "." | "..") {
        return Err(AirtableError::invalid_argument(
            name,
            format!("'{value}' is not a valid identifier"),
        ));
    }
    Ok(value)
}

/// Returns an optional string argument. Blank strings are rejected.
pub fn optional_str<'a>(args: &'a Value, name: &str) -> AirtableResult<Option<&'a str>> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Err(AirtableError::invalid_argument(
            name,
            "must not be empty",
        )),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(AirtableError::invalid_argument(name, "must be a string")),
    }
}

/// Returns an optional integer argument.
pub fn optional_i64(args: &Value, name: &str) -> AirtableResult<Option<i64>> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_i64()
            .map(Some)
            .ok_or_else(|| AirtableError::invalid_argument(name, "must be an integer")),
    }
}

/// Returns an optional boolean argument, `false` when absent.
pub fn optional_bool(args: &Value, name: &str) -> AirtableResult<bool> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(AirtableError::invalid_argument(name, "must be a boolean")),
    }
}

/// Returns an optional list of strings.
pub fn optional_string_list(args: &Value, name: &str) -> AirtableResult<Option<Vec<String>>> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    AirtableError::invalid_argument(name, "must be a list of strings")
                })
            })
            .collect::<AirtableResult<Vec<_>>>()
            .map(Some),
        Some(_) => Err(AirtableError::invalid_argument(
            name,
            "must be a list of strings",
        )),
    }
}

/// Returns the required, non-empty `fields` mapping of a create or update.
pub fn require_field_map(args: &Value, name: &str) -> AirtableResult<FieldMap> {
    match args.get(name) {
        None | Some(Value::Null) => Err(AirtableError::missing_argument(name)),
        Some(Value::Object(map)) if map.is_empty() => Err(AirtableError::invalid_argument(
            name,
            "must contain at least one field",
        )),
        Some(Value::Object(map)) => {
            if map.keys().any(|k| k.trim().is_empty()) {
                return Err(AirtableError::invalid_argument(
                    name,
                    "field names must not be empty",
                ));
            }
            Ok(map.clone())
        }
        Some(_) => Err(AirtableError::invalid_argument(
            name,
            "must be an object mapping field names to values",
        )),
    }
}

/// Reads the record filter.
///
/// `filter` may be a formula string or a `{field, op, value}` object;
/// `filter_formula` is accepted as an alias for a formula string.
pub fn optional_filter(args: &Value) -> AirtableResult<Option<Filter>> {
    let filter = args.get("filter").filter(|v| !v.is_null());
    let formula = args.get("filter_formula").filter(|v| !v.is_null());

    match (filter, formula) {
        (Some(_), Some(_)) => Err(AirtableError::invalid_argument(
            "filter",
            "pass either filter or filter_formula, not both",
        )),
        (None, None) => Ok(None),
        (None, Some(Value::String(s))) | (Some(Value::String(s)), None) => {
            Ok(Some(Filter::Formula(s.clone())))
        }
        (None, Some(_)) => Err(AirtableError::invalid_argument(
            "filter_formula",
            "must be a string",
        )),
        (Some(Value::Object(obj)), None) => {
            let spec = Value::Object(obj.clone());
            let field = optional_str(&spec, "field")
                .map_err(|e| match e {
                    AirtableError::InvalidArgument { message, .. } => {
                        AirtableError::invalid_argument("filter.field", message)
                    }
                    other => other,
                })?
                .ok_or_else(|| AirtableError::missing_argument("filter.field"))?;
            let op = match spec.get("op") {
                None | Some(Value::Null) => return Err(AirtableError::missing_argument("filter.op")),
                Some(Value::String(op)) => op.parse()?,
                Some(_) => {
                    return Err(AirtableError::invalid_argument("filter.op", "must be a string"))
                }
            };
            let value = spec
                .get("value")
                .cloned()
                .ok_or_else(|| AirtableError::missing_argument("filter.value"))?;
            Ok(Some(Filter::Comparison(Comparison {
                field: field.to_string(),
                op,
                value,
            })))
        }
        (Some(_), None) => Err(AirtableError::invalid_argument(
            "filter",
            "must be a formula string or an object with field, op and value",
        )),
    }
}
