//! CLI commands and argument parsing

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::source::jaffle_shop;

/// REST extraction pipeline CLI
#[derive(Parser, Debug)]
#[command(name = "restpipe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract a source and load it into DuckDB
    Run(RunArgs),

    /// List the resources of a source
    Resources {
        /// Built-in source name or path to a YAML definition
        #[arg(short, long, default_value = "jaffle_shop")]
        source: String,
    },

    /// Validate a source definition
    Validate {
        /// Built-in source name or path to a YAML definition
        #[arg(short, long, default_value = "jaffle_shop")]
        source: String,
    },
}

/// Options of the `run` command
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Built-in source name or path to a YAML definition
    #[arg(short, long, default_value = "jaffle_shop")]
    pub source: String,

    /// Override the source's base URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Pipeline name, also the default database file name
    #[arg(long, default_value = jaffle_shop::PIPELINE_NAME)]
    pub pipeline_name: String,

    /// Dataset (schema) the tables are created in
    #[arg(long, default_value = "jaffle_shop")]
    pub dataset: String,

    /// DuckDB database file (default: <pipeline_name>.duckdb)
    #[arg(long)]
    pub database: Option<PathBuf>,

    /// Resources to run (comma-separated, empty = all)
    #[arg(long, value_delimiter = ',')]
    pub resources: Vec<String>,

    /// Stop every resource after this many pages
    #[arg(long)]
    pub page_limit: Option<usize>,

    /// Resources extracted concurrently
    #[arg(long)]
    pub extract_workers: Option<usize>,

    /// Pages normalized concurrently
    #[arg(long)]
    pub normalize_workers: Option<usize>,

    /// Rows buffered per table before a write
    #[arg(long)]
    pub buffer_max_items: Option<usize>,
}
