//! Pagination strategy implementations
//!
//! Each strategy handles a specific pagination pattern.

use super::types::{NextPage, PageResponse, Paginator};
use crate::decode::extract_simple_path;
use serde_json::Value;
use tracing::debug;
use url::Url;

// ============================================================================
// Link Header Pagination
// ============================================================================

/// Link header pagination (RFC 8288)
///
/// Extracts next page URL from the Link header.
/// Format: `Link: <https://api.example.com/items?page=2>; rel="next", ...`
#[derive(Debug, Clone)]
pub struct LinkHeaderPaginator {
    /// Rel value to follow (default: "next")
    pub rel: String,
}

impl Default for LinkHeaderPaginator {
    fn default() -> Self {
        Self {
            rel: "next".to_string(),
        }
    }
}

impl LinkHeaderPaginator {
    /// Create a new link header paginator
    pub fn new(rel: impl Into<String>) -> Self {
        Self { rel: rel.into() }
    }
}

impl Paginator for LinkHeaderPaginator {
    fn name(&self) -> &'static str {
        "header_link"
    }

    fn next_page(&self, response: &PageResponse<'_>) -> NextPage {
        let links = response
            .headers
            .get_all(reqwest::header::LINK)
            .iter()
            .filter_map(|v| v.to_str().ok());

        for header in links {
            if let Some(target) = parse_link_header(header, &self.rel) {
                return resolve(response.url, &target);
            }
        }

        NextPage::Done
    }
}

/// Parse a Link header and extract the URL for the given rel
pub(crate) fn parse_link_header(header: &str, target_rel: &str) -> Option<String> {
    // Link header format: <url>; rel="next", <url>; rel="prev"
    for part in header.split(',') {
        let part = part.trim();
        let mut url = None;
        let mut rels: Option<&str> = None;

        for segment in part.split(';') {
            let segment = segment.trim();
            if segment.starts_with('<') && segment.ends_with('>') && segment.len() >= 2 {
                url = Some(&segment[1..segment.len() - 1]);
            } else if let Some((key, value)) = segment.split_once('=') {
                if key.trim().eq_ignore_ascii_case("rel") {
                    rels = Some(value.trim().trim_matches('"').trim_matches('\''));
                }
            }
        }

        // rel may hold several space separated relation types
        if let (Some(u), Some(r)) = (url, rels) {
            if r.split_whitespace()
                .any(|rel| rel.eq_ignore_ascii_case(target_rel))
            {
                return Some(u.to_string());
            }
        }
    }

    None
}

// ============================================================================
// Next URL Pagination
// ============================================================================

/// Next URL pagination (URL in response body)
///
/// Extracts next page URL from a field in the response body.
/// Common patterns:
/// - `{ "next": "https://api.example.com/items?page=2" }`
/// - `{ "pagination": { "next_url": "..." } }`
#[derive(Debug, Clone)]
pub struct NextUrlPaginator {
    /// Dot path to the next URL in the response body
    pub path: String,
}

impl NextUrlPaginator {
    /// Create a new next URL paginator
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl Paginator for NextUrlPaginator {
    fn name(&self) -> &'static str {
        "json_link"
    }

    fn next_page(&self, response: &PageResponse<'_>) -> NextPage {
        match extract_simple_path(response.body, &self.path) {
            Some(Value::String(next)) if !next.trim().is_empty() => resolve(response.url, &next),
            _ => NextPage::Done,
        }
    }
}

// ============================================================================
// Single Page
// ============================================================================

/// No pagination - single request
#[derive(Debug, Clone, Default)]
pub struct SinglePagePaginator;

impl Paginator for SinglePagePaginator {
    fn name(&self) -> &'static str {
        "single_page"
    }

    fn next_page(&self, _response: &PageResponse<'_>) -> NextPage {
        NextPage::Done
    }
}

/// Resolve a cursor against the URL of the response that carried it
///
/// A cursor that is not a valid URL ends pagination.
fn resolve(base: &Url, target: &str) -> NextPage {
    match base.join(target.trim()) {
        Ok(url) => NextPage::Continue(url),
        Err(e) => {
            debug!("Ignoring malformed pagination link '{}': {}", target, e);
            NextPage::Done
        }
    }
}
