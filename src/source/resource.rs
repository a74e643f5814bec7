//! Resource definitions and their page streams

use futures::{Stream, StreamExt};
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tracing::info;

use crate::error::{Error, Result};
use crate::http::RestClient;
use crate::pagination::limit_pages;
use crate::types::{Page, PageStream, QueryParams};

/// A named extraction unit bound to one endpoint
///
/// The endpoint and initial parameters are fixed once the resource is built.
/// A resource holds no pagination state of its own: every call to
/// [`Resource::extract`] starts a fresh sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    name: String,
    endpoint: String,
    table_name: String,
    params: QueryParams,
    page_limit: Option<usize>,
}

impl Resource {
    /// Create a resource named `name` reading from `endpoint`
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            table_name: name.clone(),
            name,
            endpoint: endpoint.into(),
            params: QueryParams::new(),
            page_limit: None,
        }
    }

    /// Add an initial query parameter
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(key.into(), value.to_string());
        self
    }

    /// Replace the initial query parameters
    #[must_use]
    pub fn with_params(mut self, params: QueryParams) -> Self {
        self.params = params;
        self
    }

    /// Load into `table` instead of a table named after the resource
    #[must_use]
    pub fn table_name(mut self, table: impl Into<String>) -> Self {
        self.table_name = table.into();
        self
    }

    /// Stop after `limit` pages
    #[must_use]
    pub fn with_page_limit(mut self, limit: usize) -> Self {
        self.page_limit = Some(limit);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Destination table
    pub fn table(&self) -> &str {
        &self.table_name
    }

    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    pub fn page_limit(&self) -> Option<usize> {
        self.page_limit
    }

    /// Lazily page through the resource's endpoint
    ///
    /// Pages are yielded unmodified. Nothing is fetched until the stream is
    /// polled; errors end the stream after being yielded once.
    pub fn extract(&self, client: &Arc<RestClient>) -> PageStream {
        let pages = client.paginate(&self.endpoint, self.params.clone());
        let pages = match self.page_limit {
            Some(limit) => limit_pages(pages, self.name.clone(), Some(limit)).boxed(),
            None => pages,
        };
        ResourcePages::new(pages, self.name.clone()).boxed()
    }
}

pin_project! {
    /// Logs the start and the natural end of one resource's extraction
    struct ResourcePages<S> {
        #[pin]
        inner: S,
        resource: String,
        started: bool,
        errored: bool,
        done: bool,
    }
}

impl<S> ResourcePages<S> {
    fn new(inner: S, resource: String) -> Self {
        Self {
            inner,
            resource,
            started: false,
            errored: false,
            done: false,
        }
    }
}

impl<S> Stream for ResourcePages<S>
where
    S: Stream<Item = Result<Page>>,
{
    type Item = Result<Page>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();

        if !*this.started {
            info!("Starting extraction of {} data", this.resource);
            *this.started = true;
        }

        match this.inner.poll_next(cx) {
            Poll::Ready(None) => {
                if !*this.errored && !*this.done {
                    info!("Completed extraction of {} data", this.resource);
                }
                *this.done = true;
                Poll::Ready(None)
            }
            Poll::Ready(Some(Err(e))) => {
                *this.errored = true;
                Poll::Ready(Some(Err(e)))
            }
            other => other,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// A named, ordered collection of resources extracted together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    name: String,
    resources: Vec<Resource>,
}

impl Source {
    /// Create a source from resources, keeping their order
    pub fn new(name: impl Into<String>, resources: Vec<Resource>) -> Self {
        Self {
            name: name.into(),
            resources,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resources in extraction order
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Look up a resource by name
    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.name == name)
    }

    /// Names of the resources in order
    pub fn resource_names(&self) -> Vec<&str> {
        self.resources.iter().map(|r| r.name.as_str()).collect()
    }

    /// Keep only the named resources, in source order
    pub fn with_resources<I, S>(&self, names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<String> = names.into_iter().map(|n| n.as_ref().to_string()).collect();
        for name in &names {
            if self.resource(name).is_none() {
                return Err(Error::ResourceNotFound {
                    resource: name.clone(),
                    source_name: self.name.clone(),
                });
            }
        }

        let resources = self
            .resources
            .iter()
            .filter(|r| names.contains(&r.name))
            .cloned()
            .collect();

        Ok(Self {
            name: self.name.clone(),
            resources,
        })
    }

    /// Apply a page limit to every resource
    #[must_use]
    pub fn with_page_limit(mut self, limit: usize) -> Self {
        self.resources = self
            .resources
            .into_iter()
            .map(|r| r.with_page_limit(limit))
            .collect();
        self
    }
}
