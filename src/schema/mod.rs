//! Schema inference module
//!
//! Works out destination column types from normalized rows.
//!
//! # Features
//!
//! - **Type Inference**: BIGINT, DOUBLE, BOOLEAN, DATE, TIMESTAMP, VARCHAR
//! - **Schema Merging**: widens column types as new rows arrive
//! - **Nullable Detection**: columns missing or null in some rows
//! - **Null-only columns**: never created

mod inference;
mod types;

pub use inference::{
    infer_table_schema, is_date, is_timestamp, normalize_timestamp, parse_timestamp,
    SchemaInferrer, TIMESTAMP_FORMAT,
};
pub use types::{Column, DataType, TableSchema};

#[cfg(test)]
mod tests;
