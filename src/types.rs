//! Common types used throughout restpipe
//!
//! This module contains shared type definitions, type aliases,
//! and utility types used across multiple modules.

use futures::stream::BoxStream;
use std::collections::BTreeMap;

use crate::error::Result;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// Query parameters sent with every request of a pagination sequence
pub type QueryParams = BTreeMap<String, String>;

/// A flat, normalized row destined for one table
pub type Row = JsonObject;

/// Lazy sequence of pages produced by a paginated endpoint
pub type PageStream = BoxStream<'static, Result<Page>>;

// ============================================================================
// Page
// ============================================================================

/// One batch of records returned by a single HTTP response
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// 1-based position of this page in its pagination sequence
    pub number: usize,
    /// URL the page was fetched from (including query string)
    pub url: String,
    /// Records in response order
    pub records: Vec<JsonValue>,
}

impl Page {
    /// Create a new page
    pub fn new(number: usize, url: impl Into<String>, records: Vec<JsonValue>) -> Self {
        Self {
            number,
            url: url.into(),
            records,
        }
    }

    /// Number of records in the page
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the page carries no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Consume the page, returning its records
    pub fn into_records(self) -> Vec<JsonValue> {
        self.records
    }
}

/// Render a JSON scalar as a query parameter value
///
/// Strings are used verbatim, everything else through its JSON text.
pub fn param_value(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}
