//! CLI module
//!
//! Command-line interface for running pipelines.
//!
//! # Commands
//!
//! - `run` - Extract a source and load it into DuckDB
//! - `resources` - List the resources of a source
//! - `validate` - Check a source definition

mod commands;
mod runner;

pub use commands::{Cli, Commands, RunArgs};
pub use runner::Runner;
