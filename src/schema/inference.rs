//! Column type inference from normalized rows

use super::types::{Column, DataType, TableSchema};
use crate::types::Row;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

// 2024-01-15T10:30:00Z, 2024-01-15 10:30:00, 2024-01-15T10:30:00.123+02:00
static DATETIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}(:\d{2}(\.\d+)?)?(Z|[+-]\d{2}:?\d{2})?$")
        .unwrap()
});

/// Format stored for TIMESTAMP columns
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Schema inferrer with configuration options
#[derive(Debug, Clone)]
pub struct SchemaInferrer {
    /// Detect ISO dates and date-times in strings
    detect_dates: bool,
}

impl Default for SchemaInferrer {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaInferrer {
    /// Create a new schema inferrer with default settings
    pub fn new() -> Self {
        Self { detect_dates: true }
    }

    /// Enable/disable date detection
    #[must_use]
    pub fn with_date_detection(mut self, enabled: bool) -> Self {
        self.detect_dates = enabled;
        self
    }

    /// Type of a single value, `None` for null
    pub fn infer_value(&self, value: &Value) -> Option<DataType> {
        match value {
            Value::Null => None,
            Value::Bool(_) => Some(DataType::Boolean),
            Value::Number(n) => {
                if n.is_i64() {
                    Some(DataType::Bigint)
                } else {
                    Some(DataType::Double)
                }
            }
            Value::String(s) => Some(self.infer_string(s)),
            // nested values are stored as JSON text
            Value::Array(_) | Value::Object(_) => Some(DataType::Text),
        }
    }

    fn infer_string(&self, s: &str) -> DataType {
        if self.detect_dates {
            if is_date(s) {
                return DataType::Date;
            }
            if is_timestamp(s) {
                return DataType::Timestamp;
            }
        }
        DataType::Text
    }

    /// Infer the schema of `table` from its rows
    ///
    /// Columns only ever seen with null values are left out.
    pub fn infer_table(&self, table: &str, rows: &[Row]) -> TableSchema {
        let mut schema = TableSchema::new(table);
        let mut seen: BTreeMap<&str, usize> = BTreeMap::new();

        for row in rows {
            for (key, value) in row {
                *seen.entry(key.as_str()).or_insert(0) += 1;
                let Some(data_type) = self.infer_value(value) else {
                    continue;
                };
                schema.merge_column(Column::new(key.clone(), data_type));
            }
        }

        for row in rows {
            for (key, value) in row {
                if value.is_null() {
                    schema.mark_nullable(key);
                }
            }
        }
        for (key, count) in seen {
            if count < rows.len() {
                schema.mark_nullable(key);
            }
        }

        schema
    }
}

/// Infer a table schema with default settings (convenience function)
pub fn infer_table_schema(table: &str, rows: &[Row]) -> TableSchema {
    SchemaInferrer::new().infer_table(table, rows)
}

/// Whether `s` is an ISO 8601 calendar date
pub fn is_date(s: &str) -> bool {
    DATE_RE.is_match(s) && NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

/// Whether `s` is an ISO 8601 date-time
pub fn is_timestamp(s: &str) -> bool {
    DATETIME_RE.is_match(s) && parse_timestamp(s).is_some()
}

/// Parse an ISO 8601 date-time (or date) into naive UTC
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f%z",
        "%Y-%m-%d %H:%M:%S%.f%z",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(dt) = DateTime::parse_from_str(s, format) {
            return Some(dt.naive_utc());
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Render a date-time string in the form stored in TIMESTAMP columns
pub fn normalize_timestamp(s: &str) -> Option<String> {
    parse_timestamp(s).map(|dt| dt.format(TIMESTAMP_FORMAT).to_string())
}
