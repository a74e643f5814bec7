//! Load destinations
//!
//! A [`Destination`] receives flat rows per table and records completed
//! loads. [`DuckDbDestination`] writes into a local DuckDB database file.

mod engine;

pub use engine::{quote_ident, DuckDbDestination, LOADS_TABLE, MEMORY};

use crate::error::Result;
use crate::types::Row;

/// Storage that normalized rows are written to
///
/// Writes are synchronous; the pipeline drives a destination from a
/// blocking task.
pub trait Destination: Send {
    /// Short destination type name, e.g. `duckdb`
    fn name(&self) -> &'static str;

    /// Where the data ends up (file path, URL)
    fn location(&self) -> &str;

    /// Dataset (schema) the tables live in
    fn dataset(&self) -> &str;

    /// Write rows into `table`, creating or evolving it as needed
    ///
    /// Returns the number of rows written.
    fn write_rows(&mut self, table: &str, rows: &[Row]) -> Result<usize>;

    /// Record `load_id` as completed
    fn complete_load(&mut self, load_id: &str, pipeline_name: &str) -> Result<()>;
}
