//! Pagination types and traits
//!
//! Defines the core pagination abstractions used by all strategies.

use crate::types::QueryParams;
use reqwest::header::HeaderMap;
use serde_json::Value;
use url::Url;

/// Result of the next page computation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextPage {
    /// More pages available at this URL
    Continue(Url),
    /// No more pages
    Done,
}

impl NextPage {
    /// Check if this is a done result
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Check if this is a continue result
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue(_))
    }
}

/// The response a paginator inspects to find the next page
#[derive(Debug, Clone, Copy)]
pub struct PageResponse<'a> {
    /// URL the response was served from, used to resolve relative links
    pub url: &'a Url,
    /// Response headers
    pub headers: &'a HeaderMap,
    /// Decoded response body (before record selection)
    pub body: &'a Value,
    /// Number of records selected from the body
    pub records_count: usize,
}

/// One request of a pagination sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Request URL without query string
    pub url: Url,
    /// Query parameters sent with the request
    pub params: QueryParams,
    /// 1-based page number
    pub number: usize,
}

impl PageRequest {
    /// The first request of a sequence
    pub fn first(url: Url, params: QueryParams) -> Self {
        let mut request = Self {
            url,
            params,
            number: 1,
        };
        request.absorb_url_query();
        request
    }

    /// Build the request for a cursor URL
    ///
    /// Keeps the current parameters; parameters carried by the cursor URL
    /// override them.
    pub fn follow(&self, next_url: Url) -> Self {
        let mut request = Self {
            url: next_url,
            params: self.params.clone(),
            number: self.number + 1,
        };
        request.absorb_url_query();
        request
    }

    /// Full URL including the query string, used as the page identity
    pub fn full_url(&self) -> Url {
        let mut url = self.url.clone();
        if !self.params.is_empty() {
            url.query_pairs_mut().extend_pairs(self.params.iter());
        }
        url
    }

    /// Move query pairs of the URL into `params`
    fn absorb_url_query(&mut self) {
        if self.url.query().is_none() {
            return;
        }
        for (key, value) in self.url.query_pairs() {
            self.params.insert(key.into_owned(), value.into_owned());
        }
        self.url.set_query(None);
    }
}

/// Core trait for pagination strategies
///
/// Implementations are stateless: everything a strategy needs to find the
/// next page is in the response, so one paginator can drive any number of
/// independent sequences.
pub trait Paginator: Send + Sync + std::fmt::Debug {
    /// Short name of the strategy (for logging)
    fn name(&self) -> &'static str;

    /// Inspect a response and determine if there's a next page
    fn next_page(&self, response: &PageResponse<'_>) -> NextPage;
}
