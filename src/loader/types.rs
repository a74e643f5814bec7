//! Loader types
//!
//! Declarative source definition types for YAML parsing.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use crate::config::PipelineSettings;
use crate::error::Result;
use crate::http::{RestClient, RestClientConfig};
use crate::pagination::{LinkHeaderPaginator, NextUrlPaginator, Paginator, SinglePagePaginator};
use crate::source::{Resource, Source};
use crate::types::{param_value, JsonValue, QueryParams};

// ============================================================================
// Source Definition
// ============================================================================

/// Top-level source definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SourceDefinition {
    /// Source name
    pub name: String,
    /// Base URL for all endpoints
    pub base_url: String,
    /// How the next page is found
    #[serde(default)]
    pub paginator: PaginatorDefinition,
    /// Path to the records in response bodies
    #[serde(default)]
    pub data_selector: Option<String>,
    /// HTTP client configuration
    #[serde(default)]
    pub http: HttpDefinition,
    /// Resource definitions, in extraction order
    pub resources: Vec<ResourceDefinition>,
}

impl SourceDefinition {
    /// Client configuration for this source
    pub fn client_config(&self) -> RestClientConfig {
        let mut builder = RestClientConfig::builder()
            .base_url(&self.base_url)
            .timeout(Duration::from_secs(self.http.timeout_secs));
        for (key, value) in &self.http.headers {
            builder = builder.header(key, value);
        }
        if let Some(path) = &self.data_selector {
            builder = builder.data_selector(path);
        }
        builder.build()
    }

    /// Build the source's resources
    pub fn source(&self) -> Source {
        Source::new(
            &self.name,
            self.resources.iter().map(ResourceDefinition::resource).collect(),
        )
    }

    /// Turn the definition into a runnable source
    pub fn into_loaded(self) -> LoadedSource {
        LoadedSource {
            source: self.source(),
            client_config: self.client_config(),
            paginator: self.paginator,
            settings: PipelineSettings::default(),
        }
    }
}

// ============================================================================
// HTTP Definition
// ============================================================================

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HttpDefinition {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Headers sent with every request
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl Default for HttpDefinition {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            headers: HashMap::new(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

// ============================================================================
// Paginator Definition
// ============================================================================

/// Pagination strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaginatorDefinition {
    /// Follow the `Link` response header
    HeaderLink {
        /// Relation type of the next link
        #[serde(default = "default_links_next_key")]
        links_next_key: String,
    },
    /// Follow a URL found in the response body
    JsonLink {
        /// Dot path to the next URL
        next_url_path: String,
    },
    /// Fetch one page only
    SinglePage,
}

impl Default for PaginatorDefinition {
    fn default() -> Self {
        Self::HeaderLink {
            links_next_key: default_links_next_key(),
        }
    }
}

fn default_links_next_key() -> String {
    "next".to_string()
}

impl PaginatorDefinition {
    /// Build the paginator
    pub fn build(&self) -> Box<dyn Paginator> {
        match self {
            Self::HeaderLink { links_next_key } => {
                Box::new(LinkHeaderPaginator::new(links_next_key.clone()))
            }
            Self::JsonLink { next_url_path } => {
                Box::new(NextUrlPaginator::new(next_url_path.clone()))
            }
            Self::SinglePage => Box::new(SinglePagePaginator),
        }
    }
}

// ============================================================================
// Resource Definition
// ============================================================================

/// Resource definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ResourceDefinition {
    /// Resource name
    pub name: String,
    /// Endpoint path relative to the base URL, defaults to the name
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Destination table, defaults to the name
    #[serde(default)]
    pub table_name: Option<String>,
    /// Query parameters of the first request
    #[serde(default)]
    pub params: BTreeMap<String, JsonValue>,
    /// Stop after this many pages
    #[serde(default)]
    pub page_limit: Option<usize>,
}

impl ResourceDefinition {
    /// Build the resource
    pub fn resource(&self) -> Resource {
        let params: QueryParams = self
            .params
            .iter()
            .map(|(k, v)| (k.clone(), param_value(v)))
            .collect();

        let mut resource = Resource::new(
            &self.name,
            self.endpoint.as_deref().unwrap_or(&self.name),
        )
        .with_params(params);
        if let Some(table) = &self.table_name {
            resource = resource.table_name(table);
        }
        if let Some(limit) = self.page_limit {
            resource = resource.with_page_limit(limit);
        }
        resource
    }
}

// ============================================================================
// Loaded Source
// ============================================================================

/// A source together with what is needed to build its client
#[derive(Debug, Clone)]
pub struct LoadedSource {
    /// Resources to extract
    pub source: Source,
    /// Client configuration
    pub client_config: RestClientConfig,
    /// Pagination strategy
    pub paginator: PaginatorDefinition,
    /// Settings the source runs with unless the environment or flags say otherwise
    pub settings: PipelineSettings,
}

impl LoadedSource {
    /// Point the client at another API root
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.client_config.base_url = base_url.into();
        self
    }

    /// Build the REST client
    pub fn client(&self) -> Result<RestClient> {
        RestClient::with_boxed_paginator(self.client_config.clone(), self.paginator.build())
    }
}
