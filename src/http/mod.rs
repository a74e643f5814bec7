//! HTTP client module
//!
//! Provides the REST client the resources page through.
//!
//! # Features
//!
//! - **Base URL**: endpoints are paths relative to one API root
//! - **Pagination**: lazy page streams driven by a [`crate::pagination::Paginator`]
//! - **Record selection**: records picked out of JSON bodies
//! - **Fail fast**: no retries, the first failed request ends the stream

mod client;

pub use client::{RestClient, RestClientConfig, RestClientConfigBuilder};
