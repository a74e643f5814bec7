// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]

//! # restpipe
//!
//! Extracts paginated REST resources and loads them into DuckDB.
//!
//! ## Features
//!
//! - **Lazy pagination**: pages are requested only as they are consumed
//! - **Page limits**: opt-in cap on the pages a resource yields
//! - **Normalization**: nested records become flat rows and child tables
//! - **Schema evolution**: tables are created, extended and widened on load
//! - **YAML sources**: declare a source instead of writing code
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use restpipe::{jaffle_shop, Pipeline, PipelineConfig, Result};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Arc::new(jaffle_shop::client()?);
//!     let source = jaffle_shop::jaffle_shop_source();
//!
//!     let pipeline = Pipeline::new(PipelineConfig::new("jaffle_shop_pipeline", "jaffle_shop"))?;
//!     let trace = pipeline.run(&source, client).await?;
//!     println!("{trace}");
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌─────────────┐   ┌──────────────┐
//! │  Source  │──▶│ Extract   │──▶│ Normalize   │──▶│ Load         │
//! │Resources │   │ paginate  │   │ flatten     │   │ infer schema │
//! │          │   │ limit     │   │ child tables│   │ DuckDB       │
//! └──────────┘   └───────────┘   └─────────────┘   └──────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// HTTP client driving paginated requests
pub mod http;

/// Pagination strategies and the page limiter
pub mod pagination;

/// Record selection from response bodies
pub mod decode;

/// Resources and sources
pub mod source;

/// Flattening records into table rows
pub mod normalize;

/// Column type inference
pub mod schema;

/// Load destinations
pub mod destination;

/// Pipeline runner
pub mod pipeline;

/// Pipeline configuration
pub mod config;

/// YAML loader for source definitions
pub mod loader;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::{PipelineConfig, PipelineSettings};
pub use destination::{Destination, DuckDbDestination};
pub use http::{RestClient, RestClientConfig};
pub use loader::{load_source, load_source_from_str, LoadedSource, SourceDefinition};
pub use pagination::{limit_pages, LimitPages};
pub use pipeline::{Pipeline, RunTrace};
pub use source::{jaffle_shop, Resource, Source};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
