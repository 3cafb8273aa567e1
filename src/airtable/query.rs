//! Translation of tool arguments into Airtable list-records queries.
//!
//! This is a pure mapping: nothing here performs I/O, and a [`Query`]
//! reflects its inputs exactly. Field names are not checked against the
//! table schema; Airtable rejects unknown names with a 422.
//!
//! # Filters
//!
//! A filter is either a raw formula passed through verbatim, or a
//! [`Comparison`] rendered into Airtable formula syntax:
//!
//! ```text
//! {field: "Status", op: "eq", value: "Done"}   =>  {Status} = "Done"
//! {field: "Name", op: "contains", value: "x"}  =>  FIND("x", {Name}) > 0
//! {field: "Done", op: "eq", value: true}       =>  {Done} = TRUE()
//! ```

use std::fmt::Write as _;
use std::str::FromStr;

use serde_json::Value;

use crate::airtable::error::{AirtableError, AirtableResult};

/// Largest page size Airtable accepts.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Comparison operators available in structured filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    /// Equal.
    Eq,
    /// Not equal.
    Neq,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Case-sensitive substring match.
    Contains,
}

impl ComparisonOp {
    const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Neq => "!=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Contains => "",
        }
    }
}

impl FromStr for ComparisonOp {
    type Err = AirtableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "eq" | "=" | "==" => Ok(Self::Eq),
            "neq" | "ne" | "!=" | "<>" => Ok(Self::Neq),
            "gt" | ">" => Ok(Self::Gt),
            "gte" | "ge" | ">=" => Ok(Self::Gte),
            "lt" | "<" => Ok(Self::Lt),
            "lte" | "le" | "<=" => Ok(Self::Lte),
            "contains" => Ok(Self::Contains),
            other => Err(AirtableError::invalid_argument(
                "filter.op",
                format!(
                    "unknown operator '{other}'. Valid operators: eq, neq, gt, gte, lt, lte, contains"
                ),
            )),
        }
    }
}

/// A single `field op value` condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    /// Field name.
    pub field: String,
    /// Operator.
    pub op: ComparisonOp,
    /// Literal to compare against.
    pub value: Value,
}

/// A record filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Airtable formula, sent unchanged.
    Formula(String),
    /// Structured condition rendered into a formula.
    Comparison(Comparison),
}

impl Filter {
    /// Renders the filter as an Airtable formula.
    ///
    /// Returns `Ok(None)` for a blank formula, meaning "no filter".
    ///
    /// # Errors
    ///
    /// Returns [`AirtableError::InvalidArgument`] if a structured comparison
    /// cannot be expressed as a formula.
    pub fn to_formula(&self) -> AirtableResult<Option<String>> {
        match self {
            Self::Formula(formula) => {
                if formula.trim().is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(formula.clone()))
                }
            }
            Self::Comparison(cmp) => render_comparison(cmp).map(Some),
        }
    }
}

fn render_comparison(cmp: &Comparison) -> AirtableResult<String> {
    let field = field_reference(&cmp.field)?;

    if cmp.op == ComparisonOp::Contains {
        let Value::String(needle) = &cmp.value else {
            return Err(AirtableError::invalid_argument(
                "filter.value",
                "'contains' requires a string value",
            ));
        };
        return Ok(format!("FIND({}, {field}) > 0", string_literal(needle)));
    }

    let literal = value_literal(&cmp.value)?;
    if cmp.value.is_null() && !matches!(cmp.op, ComparisonOp::Eq | ComparisonOp::Neq) {
        return Err(AirtableError::invalid_argument(
            "filter.value",
            "null can only be compared with eq or neq",
        ));
    }
    Ok(format!("{field} {} {literal}", cmp.op.symbol()))
}

fn field_reference(name: &str) -> AirtableResult<String> {
    if name.trim().is_empty() {
        return Err(AirtableError::invalid_argument(
            "filter.field",
            "field name cannot be empty",
        ));
    }
    if name.contains('{') || name.contains('}') {
        return Err(AirtableError::invalid_argument(
            "filter.field",
            "field names containing braces cannot be used in a structured filter; pass a formula instead",
        ));
    }
    Ok(format!("{{{name}}}"))
}

fn string_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

fn value_literal(value: &Value) -> AirtableResult<String> {
    match value {
        Value::String(s) => Ok(string_literal(s)),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(true) => Ok("TRUE()".to_string()),
        Value::Bool(false) => Ok("FALSE()".to_string()),
        Value::Null => Ok("BLANK()".to_string()),
        Value::Array(_) | Value::Object(_) => Err(AirtableError::invalid_argument(
            "filter.value",
            "value must be a string, number, boolean or null",
        )),
    }
}

/// Raw, unvalidated list-records arguments.
#[derive(Debug, Clone, Default)]
pub struct QueryArgs {
    /// Optional filter.
    pub filter: Option<Filter>,
    /// Optional subset of field names to return.
    pub fields: Option<Vec<String>>,
    /// Optional cap on the total number of records.
    pub max_records: Option<i64>,
    /// Optional number of records per page.
    pub page_size: Option<i64>,
    /// Optional cursor from a previous page.
    pub cursor: Option<String>,
}

impl QueryArgs {
    /// Validates the arguments and builds the query.
    ///
    /// # Errors
    ///
    /// Returns [`AirtableError::InvalidArgument`] if `max_records` is not
    /// positive, `page_size` is outside `1..=100`, a field name is blank,
    /// or the filter cannot be rendered.
    pub fn translate(self) -> AirtableResult<Query> {
        let filter_formula = match &self.filter {
            Some(filter) => filter.to_formula()?,
            None => None,
        };

        let fields = self.fields.unwrap_or_default();
        if fields.iter().any(|f| f.trim().is_empty()) {
            return Err(AirtableError::invalid_argument(
                "fields",
                "field names cannot be empty",
            ));
        }

        let max_records = self
            .max_records
            .map(|n| {
                u32::try_from(n).ok().filter(|&n| n > 0).ok_or_else(|| {
                    AirtableError::invalid_argument(
                        "max_records",
                        format!("must be a positive integer, got {n}"),
                    )
                })
            })
            .transpose()?;

        let page_size = self
            .page_size
            .map(|n| {
                u32::try_from(n)
                    .ok()
                    .filter(|n| (1..=MAX_PAGE_SIZE).contains(n))
                    .ok_or_else(|| {
                        AirtableError::invalid_argument(
                            "page_size",
                            format!("must be between 1 and {MAX_PAGE_SIZE}, got {n}"),
                        )
                    })
            })
            .transpose()?;

        let cursor = self.cursor.filter(|c| !c.is_empty());

        Ok(Query {
            filter_formula,
            fields,
            max_records,
            page_size,
            cursor,
        })
    }
}

/// A validated list-records query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    /// Formula sent as `filterByFormula`.
    pub filter_formula: Option<String>,
    /// Field names sent as repeated `fields[]`.
    pub fields: Vec<String>,
    /// Sent as `maxRecords`.
    pub max_records: Option<u32>,
    /// Sent as `pageSize`.
    pub page_size: Option<u32>,
    /// Sent as `offset`, byte-for-byte.
    pub cursor: Option<String>,
}

impl Query {
    /// Returns the query-string pairs in a stable order.
    #[must_use]
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(formula) = &self.filter_formula {
            params.push(("filterByFormula".to_string(), formula.clone()));
        }
        for field in &self.fields {
            params.push(("fields[]".to_string(), field.clone()));
        }
        if let Some(n) = self.max_records {
            params.push(("maxRecords".to_string(), n.to_string()));
        }
        if let Some(n) = self.page_size {
            params.push(("pageSize".to_string(), n.to_string()));
        }
        if let Some(cursor) = &self.cursor {
            params.push(("offset".to_string(), cursor.clone()));
        }
        params
    }

    /// Short human-readable summary for logs. Omits the cursor.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut out = String::new();
        if let Some(formula) = &self.filter_formula {
            let _ = write!(out, "filter={formula} ");
        }
        if !self.fields.is_empty() {
            let _ = write!(out, "fields={} ", self.fields.len());
        }
        if let Some(n) = self.max_records {
            let _ = write!(out, "max_records={n} ");
        }
        if self.cursor.is_some() {
            out.push_str("continued ");
        }
        out.trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cmp(field: &str, op: &str, value: Value) -> Filter {
        Filter::Comparison(Comparison {
            field: field.to_string(),
            op: op.parse().unwrap(),
            value,
        })
    }

    #[test]
    fn renders_string_equality() {
        let formula = cmp("Status", "eq", json!("Done")).to_formula().unwrap();
        assert_eq!(formula.as_deref(), Some(r#"{Status} = "Done""#));
    }

    #[test]
    fn renders_numbers_booleans_and_blank() {
        assert_eq!(
            cmp("Score", ">=", json!(4.5)).to_formula().unwrap().unwrap(),
            "{Score} >= 4.5"
        );
        assert_eq!(
            cmp("Done", "neq", json!(false)).to_formula().unwrap().unwrap(),
            "{Done} != FALSE()"
        );
        assert_eq!(
            cmp("Notes", "eq", Value::Null).to_formula().unwrap().unwrap(),
            "{Notes} = BLANK()"
        );
    }

    #[test]
    fn escapes_string_literals() {
        let formula = cmp("Name", "eq", json!(r#"say "hi" \o/"#))
            .to_formula()
            .unwrap()
            .unwrap();
        assert_eq!(formula, r#"{Name} = "say \"hi\" \\o/""#);
    }

    #[test]
    fn renders_contains_with_find() {
        let formula = cmp("Name", "contains", json!("bug")).to_formula().unwrap();
        assert_eq!(formula.as_deref(), Some(r#"FIND("bug", {Name}) > 0"#));
    }

    #[test]
    fn contains_requires_string() {
        let err = cmp("Count", "contains", json!(3)).to_formula().unwrap_err();
        assert_eq!(err.kind(), crate::airtable::ErrorKind::InvalidArgument);
    }

    #[test]
    fn rejects_unknown_operator_and_composite_values() {
        assert!("like".parse::<ComparisonOp>().is_err());
        assert!(cmp("Tags", "eq", json!(["a"])).to_formula().is_err());
        assert!(cmp("Notes", "gt", Value::Null).to_formula().is_err());
        assert!(cmp("a}b", "eq", json!(1)).to_formula().is_err());
    }

    #[test]
    fn raw_formula_passes_through() {
        let raw = "AND({Status}='Done', {Priority} > 2)";
        let filter = Filter::Formula(raw.to_string());
        assert_eq!(filter.to_formula().unwrap().as_deref(), Some(raw));
    }

    #[test]
    fn blank_formula_means_no_filter() {
        let query = QueryArgs {
            filter: Some(Filter::Formula("   ".to_string())),
            ..QueryArgs::default()
        }
        .translate()
        .unwrap();
        assert_eq!(query.filter_formula, None);
        assert!(query.to_params().is_empty());
    }

    #[test]
    fn max_records_is_exact() {
        for n in [1_i64, 5, 100, 101, 10_000] {
            let query = QueryArgs {
                max_records: Some(n),
                ..QueryArgs::default()
            }
            .translate()
            .unwrap();
            assert_eq!(query.max_records, Some(u32::try_from(n).unwrap()));
            assert!(query
                .to_params()
                .contains(&("maxRecords".to_string(), n.to_string())));
        }
    }

    #[test]
    fn rejects_non_positive_max_records() {
        for n in [0_i64, -1, i64::MIN] {
            let err = QueryArgs {
                max_records: Some(n),
                ..QueryArgs::default()
            }
            .translate()
            .unwrap_err();
            assert_eq!(err.kind(), crate::airtable::ErrorKind::InvalidArgument);
            assert!(err.to_string().contains("max_records"));
        }
    }

    #[test]
    fn rejects_out_of_range_page_size() {
        for n in [0_i64, 101] {
            let result = QueryArgs {
                page_size: Some(n),
                ..QueryArgs::default()
            }
            .translate();
            assert!(result.is_err());
        }
    }

    #[test]
    fn fields_and_cursor_pass_through_in_order() {
        let cursor = "itrXYZ/rec%2F123==".to_string();
        let query = QueryArgs {
            fields: Some(vec!["Name".to_string(), "Not A Real Field".to_string()]),
            cursor: Some(cursor.clone()),
            ..QueryArgs::default()
        }
        .translate()
        .unwrap();

        assert_eq!(
            query.to_params(),
            vec![
                ("fields[]".to_string(), "Name".to_string()),
                ("fields[]".to_string(), "Not A Real Field".to_string()),
                ("offset".to_string(), cursor),
            ]
        );
    }

    #[test]
    fn rejects_blank_field_name() {
        let result = QueryArgs {
            fields: Some(vec![String::new()]),
            ..QueryArgs::default()
        }
        .translate();
        assert!(result.is_err());
    }

    #[test]
    fn describe_omits_cursor_value() {
        let query = Query {
            cursor: Some("secret-cursor".to_string()),
            max_records: Some(5),
            ..Query::default()
        };
        let text = query.describe();
        assert!(text.contains("max_records=5"));
        assert!(!text.contains("secret-cursor"));
    }
}
