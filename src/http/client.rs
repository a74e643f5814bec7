//! REST client with pluggable pagination
//!
//! Provides an HTTP client that handles:
//! - Base URL resolution for endpoint paths
//! - Lazy, restartable pagination driven by a [`Paginator`]
//! - Record selection from JSON bodies
//!
//! There is no retry layer: a network error or a non-2xx status ends the
//! pagination sequence with an error.

use crate::decode::RecordSelector;
use crate::error::{Error, Result};
use crate::pagination::{LinkHeaderPaginator, NextPage, PageRequest, PageResponse, Paginator};
use crate::types::{Page, PageStream, QueryParams};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Configuration for the REST client
#[derive(Debug, Clone)]
pub struct RestClientConfig {
    /// Base URL for all endpoints
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Default headers for all requests
    pub default_headers: HashMap<String, String>,
    /// User agent string
    pub user_agent: String,
    /// Path to the records inside response bodies
    pub data_selector: Option<String>,
}

impl Default for RestClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout: Duration::from_secs(30),
            default_headers: HashMap::new(),
            user_agent: format!("restpipe/{}", env!("CARGO_PKG_VERSION")),
            data_selector: None,
        }
    }
}

impl RestClientConfig {
    /// Create a new config builder
    pub fn builder() -> RestClientConfigBuilder {
        RestClientConfigBuilder::default()
    }
}

/// Builder for REST client config
#[derive(Default)]
pub struct RestClientConfigBuilder {
    config: RestClientConfig,
}

impl RestClientConfigBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Set the data selector
    pub fn data_selector(mut self, path: impl Into<String>) -> Self {
        self.config.data_selector = Some(path.into());
        self
    }

    /// Build the config
    pub fn build(self) -> RestClientConfig {
        self.config
    }
}

/// HTTP client bound to one API and one pagination strategy
///
/// Read-only after construction; share it behind an [`Arc`].
pub struct RestClient {
    client: Client,
    config: RestClientConfig,
    base_url: Url,
    paginator: Box<dyn Paginator>,
    selector: RecordSelector,
}

impl RestClient {
    /// Create a client for `base_url` that follows `Link: rel="next"` headers
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_config(
            RestClientConfig::builder().base_url(base_url).build(),
            LinkHeaderPaginator::default(),
        )
    }

    /// Create a client with custom configuration and paginator
    pub fn with_config(config: RestClientConfig, paginator: impl Paginator + 'static) -> Result<Self> {
        Self::with_boxed_paginator(config, Box::new(paginator))
    }

    /// Create a client with a paginator chosen at runtime
    pub fn with_boxed_paginator(
        config: RestClientConfig,
        paginator: Box<dyn Paginator>,
    ) -> Result<Self> {
        if config.base_url.trim().is_empty() {
            return Err(Error::missing_field("base_url"));
        }
        let base_url = parse_base_url(&config.base_url)?;

        let mut builder = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent);

        if !config.default_headers.is_empty() {
            let mut headers = reqwest::header::HeaderMap::new();
            for (key, value) in &config.default_headers {
                let name = reqwest::header::HeaderName::from_bytes(key.as_bytes())
                    .map_err(|e| Error::invalid_value("headers", format!("{key}: {e}")))?;
                let value = reqwest::header::HeaderValue::from_str(value)
                    .map_err(|e| Error::invalid_value("headers", format!("{key}: {e}")))?;
                headers.insert(name, value);
            }
            builder = builder.default_headers(headers);
        }

        let client = builder.build()?;

        let selector = match &config.data_selector {
            Some(path) => RecordSelector::with_path(path.clone()),
            None => RecordSelector::new(),
        };

        Ok(Self {
            client,
            config,
            base_url,
            paginator,
            selector,
        })
    }

    /// Get the client configuration
    pub fn config(&self) -> &RestClientConfig {
        &self.config
    }

    /// Base URL endpoints are resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Pagination strategy in use
    pub fn paginator(&self) -> &dyn Paginator {
        self.paginator.as_ref()
    }

    /// Build full URL from an endpoint path
    pub fn build_url(&self, endpoint: &str) -> Result<Url> {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return Ok(Url::parse(endpoint)?);
        }
        let endpoint = endpoint.trim_start_matches('/');
        Ok(self.base_url.join(endpoint)?)
    }

    /// Lazily page through `endpoint`
    ///
    /// Nothing is requested until the stream is polled. Each call starts a
    /// fresh sequence from `params`; the stream ends when the paginator finds
    /// no next page, and yields a single error if a request fails.
    pub fn paginate(self: &Arc<Self>, endpoint: &str, params: QueryParams) -> PageStream {
        let first = match self.build_url(endpoint) {
            Ok(url) => PageRequest::first(url, params),
            Err(e) => return stream::once(async move { Err(e) }).boxed(),
        };

        let state = PaginationCursor {
            client: Arc::clone(self),
            next: Some(first),
            visited: HashSet::new(),
        };

        stream::try_unfold(state, |mut state| async move {
            let Some(request) = state.next.take() else {
                return Ok(None);
            };

            if !state.visited.insert(request.full_url().to_string()) {
                warn!(
                    "Pagination returned to already fetched {}, stopping",
                    request.full_url()
                );
                return Ok(None);
            }

            let (page, next) = state.client.fetch_page(&request).await?;
            state.next = next;
            Ok::<_, Error>(Some((page, state)))
        })
        .boxed()
    }

    /// Fetch one page and work out the request for the following one
    pub async fn fetch_page(&self, request: &PageRequest) -> Result<(Page, Option<PageRequest>)> {
        let full_url = request.full_url();
        debug!("Fetching page {}: GET {}", request.number, full_url);

        let mut req = self.client.get(request.url.clone());
        if !request.params.is_empty() {
            req = req.query(&request.params);
        }

        let response = req.send().await?;
        let status = response.status();
        let response_url = response.url().clone();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::http_status(
                status.as_u16(),
                response_url.as_str(),
                body,
            ));
        }

        let headers = response.headers().clone();
        let text = response.text().await?;
        let body: Value = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).map_err(|e| {
                Error::decode(format!("Failed to parse JSON from {response_url}: {e}"))
            })?
        };
        let records = self.selector.select(&body)?;

        let next = self.paginator.next_page(&PageResponse {
            url: &response_url,
            headers: &headers,
            body: &body,
            records_count: records.len(),
        });

        debug!(
            "Page {} from {}: {} records, next: {}",
            request.number,
            response_url,
            records.len(),
            if next.is_continue() { "yes" } else { "no" }
        );

        let page = Page::new(request.number, full_url.as_str(), records);
        let next = match next {
            NextPage::Continue(url) => Some(request.follow(url)),
            NextPage::Done => None,
        };

        Ok((page, next))
    }
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url.as_str())
            .field("paginator", &self.paginator)
            .field("data_selector", &self.selector.path())
            .finish_non_exhaustive()
    }
}

/// State carried between the steps of one pagination sequence
struct PaginationCursor {
    client: Arc<RestClient>,
    next: Option<PageRequest>,
    visited: HashSet<String>,
}

/// Parse the base URL, making sure it ends with a slash so that endpoint
/// paths are appended rather than replacing its last segment
fn parse_base_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    let url = Url::parse(&normalized)?;
    if url.cannot_be_a_base() {
        return Err(Error::invalid_value(
            "base_url",
            format!("'{raw}' cannot be used as a base URL"),
        ));
    }
    Ok(url)
}
