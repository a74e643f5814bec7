//! Record selection from JSON response bodies
//!
//! Turns one response body into the records of one page.

use crate::error::{Error, Result};
use serde_json::Value;

/// Keys probed, in order, when a response object wraps its records
const WELL_KNOWN_RECORD_KEYS: [&str; 5] = ["data", "items", "results", "records", "entries"];

/// Selects the records of a page from a decoded response body
#[derive(Debug, Clone, Default)]
pub struct RecordSelector {
    /// Path to the records (dot notation or JSONPath)
    data_selector: Option<String>,
}

impl RecordSelector {
    /// Create a selector that auto-detects the records
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a selector with an explicit data selector path
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            data_selector: Some(path.into()),
        }
    }

    /// Configured data selector, if any
    pub fn path(&self) -> Option<&str> {
        self.data_selector.as_deref()
    }

    /// Parse a response body and select its records
    pub fn decode(&self, body: &str) -> Result<Vec<Value>> {
        if body.trim().is_empty() {
            return Ok(vec![]);
        }
        let value: Value = serde_json::from_str(body)
            .map_err(|e| Error::decode(format!("Failed to parse JSON: {e}")))?;
        self.select(&value)
    }

    /// Select records from an already decoded body
    pub fn select(&self, value: &Value) -> Result<Vec<Value>> {
        match &self.data_selector {
            Some(path) => {
                if path.contains('*') || path.contains("..") {
                    extract_with_jsonpath(value, path)
                } else {
                    match extract_simple_path(value, path) {
                        Some(Value::Array(arr)) => Ok(arr),
                        Some(Value::Null) | None => Ok(vec![]),
                        Some(v) => Ok(vec![v]),
                    }
                }
            }
            None => Ok(detect_records(value)),
        }
    }
}

/// Find the records in a body without an explicit selector
fn detect_records(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(arr) => arr.clone(),
        Value::Null => vec![],
        Value::Object(map) => {
            for key in WELL_KNOWN_RECORD_KEYS {
                if let Some(Value::Array(arr)) = map.get(key) {
                    return arr.clone();
                }
            }

            let mut arrays = map.values().filter_map(Value::as_array);
            match (arrays.next(), arrays.next()) {
                (Some(only), None) => only.clone(),
                _ => vec![value.clone()],
            }
        }
        other => vec![other.clone()],
    }
}

/// Extract a value using simple dot-notation path
pub(crate) fn extract_simple_path(value: &Value, path: &str) -> Option<Value> {
    let path = path.strip_prefix("$.").unwrap_or(path);
    if path.is_empty() || path == "$" {
        return Some(value.clone());
    }

    let mut current = value;
    for part in path.split('.') {
        // Handle array indexing like "data[0]" or "items[-1]"
        if let Some(bracket_pos) = part.find('[') {
            let name = &part[..bracket_pos];
            let index_str = part[bracket_pos + 1..].trim_end_matches(']');

            if !name.is_empty() {
                current = current.get(name)?;
            }

            let index = index_str.parse::<i64>().ok()?;
            let Value::Array(arr) = current else {
                return None;
            };
            #[allow(clippy::cast_possible_wrap)]
            let idx = if index < 0 {
                arr.len() as i64 + index
            } else {
                index
            };
            current = arr.get(usize::try_from(idx).ok()?)?;
        } else {
            current = current.get(part)?;
        }
    }

    Some(current.clone())
}

/// Extract records using jsonpath-rust
fn extract_with_jsonpath(value: &Value, path: &str) -> Result<Vec<Value>> {
    use jsonpath_rust::JsonPath;

    let jp = JsonPath::try_from(path).map_err(|e| Error::JsonPath {
        message: format!("Invalid JSONPath: {e}"),
    })?;

    match jp.find(value) {
        Value::Array(arr) => Ok(arr),
        Value::Null => Ok(vec![]),
        other => Ok(vec![other]),
    }
}
