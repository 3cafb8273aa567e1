//! An in-memory stand-in for the Airtable REST API.
//!
//! Serves one base with one table. Enough of list, create and patch is
//! implemented to check end-to-end properties of the tools.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Url;
use serde_json::{json, Map, Value};

use airtable_mcp::airtable::{HttpRequest, HttpResponse, HttpTransport, TransportError};

pub const BASE_ID: &str = "appFAKE";
pub const TABLE_ID: &str = "tblTASKS";
pub const TABLE_NAME: &str = "Sprint Tasks";

const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Default)]
pub struct FakeAirtable {
    records: Mutex<Vec<(String, Map<String, Value>)>>,
    next_id: AtomicUsize,
    calls: AtomicUsize,
}

impl FakeAirtable {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Inserts a record directly, bypassing the API.
    pub fn seed(&self, fields: &Value) -> String {
        let id = format!("rec{:05}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let map = fields.as_object().cloned().unwrap_or_default();
        self.records.lock().unwrap().push((id.clone(), map));
        id
    }

    fn route(&self, request: &HttpRequest) -> HttpResponse {
        let segments: Vec<&str> = request
            .url
            .path_segments()
            .map(Iterator::collect)
            .unwrap_or_default();

        match (request.method.as_str(), segments.as_slice()) {
            ("GET", ["v0", "meta", "bases"]) => respond(&json!({
                "bases": [{"id": BASE_ID, "name": "Fake Base", "permissionLevel": "create"}]
            })),
            ("GET", ["v0", "meta", "bases", base, "tables"]) if is_base(base) => respond(&json!({
                "tables": [{
                    "id": TABLE_ID,
                    "name": TABLE_NAME,
                    "primaryFieldId": "fldNAME",
                    "fields": [
                        {"id": "fldNAME", "name": "Name", "type": "singleLineText"},
                        {"id": "fldSTATUS", "name": "Status", "type": "singleSelect"},
                        {"id": "fldPOINTS", "name": "Points", "type": "number"}
                    ]
                }]
            })),
            ("GET", ["v0", base, table]) if is_base(base) && is_table(table) => self.list(request),
            ("POST", ["v0", base, table]) if is_base(base) && is_table(table) => self.create(request),
            ("PATCH", ["v0", base, table, record_id]) if is_base(base) && is_table(table) => {
                self.update(record_id, request)
            }
            _ => not_found(),
        }
    }

    fn list(&self, request: &HttpRequest) -> HttpResponse {
        let mut wanted_fields = Vec::new();
        let mut max_records = usize::MAX;
        let mut page_size = DEFAULT_PAGE_SIZE;
        let mut start = 0;
        for (key, value) in request.url.query_pairs() {
            match key.as_ref() {
                "fields[]" => wanted_fields.push(value.into_owned()),
                "maxRecords" => max_records = value.parse().unwrap(),
                "pageSize" => page_size = value.parse().unwrap(),
                "offset" => match value.strip_prefix("cursor:").and_then(|n| n.parse().ok()) {
                    Some(n) => start = n,
                    None => {
                        return HttpResponse::new(
                            422,
                            r#"{"error":{"type":"LIST_RECORDS_ITERATOR_NOT_AVAILABLE"}}"#,
                        )
                    }
                },
                _ => {}
            }
        }

        let records = self.records.lock().unwrap();
        let visible = records.len().min(max_records);
        let end = visible.min(start + page_size);
        let page: Vec<Value> = records[start.min(end)..end]
            .iter()
            .map(|(id, fields)| {
                let fields: Map<String, Value> = fields
                    .iter()
                    .filter(|(k, _)| wanted_fields.is_empty() || wanted_fields.contains(k))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                json!({"id": id, "createdTime": "2024-01-01T00:00:00.000Z", "fields": fields})
            })
            .collect();

        let mut body = json!({ "records": page });
        if end < visible {
            body["offset"] = json!(format!("cursor:{end}"));
        }
        respond(&body)
    }

    fn create(&self, request: &HttpRequest) -> HttpResponse {
        let fields = request
            .body
            .as_ref()
            .and_then(|b| b["records"][0]["fields"].as_object().cloned())
            .unwrap_or_default();
        let id = self.seed(&Value::Object(fields.clone()));
        respond(&json!({ "records": [{ "id": id, "fields": fields }] }))
    }

    fn update(&self, record_id: &str, request: &HttpRequest) -> HttpResponse {
        let patch = request
            .body
            .as_ref()
            .and_then(|b| b["fields"].as_object().cloned())
            .unwrap_or_default();

        let mut records = self.records.lock().unwrap();
        let Some((id, fields)) = records.iter_mut().find(|(id, _)| id == record_id) else {
            return not_found();
        };
        for (k, v) in patch {
            fields.insert(k, v);
        }
        respond(&json!({ "id": id, "fields": fields }))
    }
}

#[async_trait]
impl HttpTransport for FakeAirtable {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.route(&request))
    }
}

/// Encodes one path segment exactly as it appears in a request URL.
fn encoded(segment: &str) -> String {
    let mut url = Url::parse("https://fake.invalid/").unwrap();
    url.path_segments_mut().unwrap().pop_if_empty().push(segment);
    url.path()[1..].to_string()
}

fn is_base(segment: &str) -> bool {
    segment == encoded(BASE_ID)
}

fn is_table(segment: &str) -> bool {
    segment == encoded(TABLE_ID) || segment == encoded(TABLE_NAME)
}

fn respond(body: &Value) -> HttpResponse {
    HttpResponse::new(200, body.to_string())
}

fn not_found() -> HttpResponse {
    HttpResponse::new(404, r#"{"error":"NOT_FOUND"}"#)
}
