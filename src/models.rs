use serde::Deserialize;
use serde_json::{Map, Value};

/// JSON input already split into records, either a bare array for a single
/// sheet or a list of named sheets.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RecordsPayload {
    Sheets { sheets: Vec<SheetPayload> },
    Records(Vec<Map<String, Value>>),
}

#[derive(Debug, Deserialize)]
pub struct SheetPayload {
    pub name: String,
    pub records: Vec<Map<String, Value>>,
}
