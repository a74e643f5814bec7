//! Identifier normalization for table and column names

use regex::Regex;
use std::sync::LazyLock;

/// Separator between the segments of flattened columns and child tables
pub const PATH_SEPARATOR: &str = "__";

// "HTTPServer" -> "HTTP_Server"
static ACRONYM_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Z]+)([A-Z][a-z])").unwrap());

// "camelCase" -> "camel_Case"
static CASE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z0-9])([A-Z])").unwrap());

static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9]+").unwrap());

/// Convert a JSON key into a snake_case identifier
///
/// A leading underscore is kept, trailing ones are dropped, and names that
/// would start with a digit get an underscore prefix.
pub fn normalize_identifier(name: &str) -> String {
    let name = name.trim();
    let name = ACRONYM_BOUNDARY.replace_all(name, "${1}_${2}");
    let name = CASE_BOUNDARY.replace_all(&name, "${1}_${2}");
    let name = NON_ALPHANUMERIC.replace_all(&name, "_");
    let mut name = name.trim_end_matches('_').to_lowercase();

    if name.is_empty() {
        return "_".to_string();
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name
}

/// Join a parent path and a child segment with the path separator
pub fn join_path(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{parent}{PATH_SEPARATOR}{child}")
    }
}
