//! YAML Loader module
//!
//! Parse source definitions from YAML files.
//!
//! # Overview
//!
//! The loader module provides:
//! - `SourceDefinition` - Declarative source description
//! - `ResourceDefinition` - Resource configuration
//! - YAML parsing with validation
//! - Built-in sources resolved by name

mod parser;
mod types;

pub use parser::{
    get_builtin, list_builtin, load_source, load_source_file, load_source_from_str,
};
pub use types::{
    HttpDefinition, LoadedSource, PaginatorDefinition, ResourceDefinition, SourceDefinition,
};
