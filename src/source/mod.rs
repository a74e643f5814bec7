//! Extraction sources
//!
//! A [`Resource`] is a stateless definition of one paginated endpoint: its
//! path, the query parameters of the first request and the table its records
//! land in. A [`Source`] bundles resources that are extracted together.
//!
//! ```rust,ignore
//! use restpipe::source::jaffle_shop;
//! use std::sync::Arc;
//!
//! let client = Arc::new(jaffle_shop::client()?);
//! let source = jaffle_shop::jaffle_shop_source();
//! let mut pages = source.resources()[0].extract(&client);
//! while let Some(page) = pages.next().await {
//!     println!("{} records", page?.len());
//! }
//! ```

pub mod jaffle_shop;
mod resource;

pub use resource::{Resource, Source};
