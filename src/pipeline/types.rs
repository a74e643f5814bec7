//! Pipeline types
//!
//! Run summaries returned by the pipeline.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;

/// What one resource contributed to a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceTrace {
    /// Resource name
    pub name: String,
    /// Root table the records were loaded into
    pub table: String,
    /// Pages fetched
    pub pages: usize,
    /// Records extracted
    pub records: usize,
}

impl ResourceTrace {
    /// Create an empty trace for a resource
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            pages: 0,
            records: 0,
        }
    }

    /// Count one page
    pub fn add_page(&mut self, records: usize) {
        self.pages += 1;
        self.records += records;
    }
}

/// Summary of a completed pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunTrace {
    /// Pipeline name
    pub pipeline_name: String,
    /// Load id stamped on every row
    pub load_id: String,
    /// Dataset the tables live in
    pub dataset_name: String,
    /// Destination type, e.g. `duckdb`
    pub destination: String,
    /// Destination location, e.g. the database file
    pub location: String,
    /// Run start
    pub started_at: DateTime<Utc>,
    /// Run end
    pub finished_at: DateTime<Utc>,
    /// Per-resource counts, in source order
    pub resources: Vec<ResourceTrace>,
    /// Rows written per table, child tables included
    pub tables: BTreeMap<String, usize>,
}

impl RunTrace {
    /// Total pages fetched
    pub fn total_pages(&self) -> usize {
        self.resources.iter().map(|r| r.pages).sum()
    }

    /// Total records extracted
    pub fn total_records(&self) -> usize {
        self.resources.iter().map(|r| r.records).sum()
    }

    /// Total rows written
    pub fn total_rows(&self) -> usize {
        self.tables.values().sum()
    }

    /// Rows written to `table`
    pub fn rows_in(&self, table: &str) -> usize {
        self.tables.get(table).copied().unwrap_or(0)
    }

    /// Counts for `resource`
    pub fn resource(&self, resource: &str) -> Option<&ResourceTrace> {
        self.resources.iter().find(|r| r.name == resource)
    }

    /// Wall-clock run time
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

impl fmt::Display for RunTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let seconds = self.duration().num_milliseconds() as f64 / 1000.0;
        writeln!(
            f,
            "Pipeline {} load step completed in {seconds:.2} seconds",
            self.pipeline_name
        )?;
        writeln!(
            f,
            "1 load package(s) were loaded to destination {} and into dataset {}",
            self.destination, self.dataset_name
        )?;
        writeln!(
            f,
            "The {} destination used {} location to store data",
            self.destination, self.location
        )?;
        writeln!(f, "Load package {} is COMPLETED", self.load_id)?;

        writeln!(f, "Resources:")?;
        for resource in &self.resources {
            writeln!(
                f,
                "  {}: {} pages, {} records",
                resource.name, resource.pages, resource.records
            )?;
        }

        write!(f, "Tables:")?;
        for (table, rows) in &self.tables {
            write!(f, "\n  {table}: {rows} rows")?;
        }
        Ok(())
    }
}
