//! Pipeline configuration
//!
//! Worker counts and buffer sizes come from environment variables and may be
//! overridden from the command line:
//!
//! | Variable | Default |
//! |----------|---------|
//! | `EXTRACT__WORKERS` | 5 |
//! | `NORMALIZE__WORKERS` | 1 |
//! | `DATA_WRITER__BUFFER_MAX_ITEMS` | 5000 |
//!
//! A source may bring its own defaults (the built-in jaffle shop runs with 12
//! extract and 4 normalize workers); variables and flags still win over them.

use std::path::PathBuf;

use crate::error::{Error, Result};

/// Environment variable for the number of resources extracted concurrently
pub const EXTRACT_WORKERS_ENV: &str = "EXTRACT__WORKERS";
/// Environment variable for the number of pages normalized concurrently
pub const NORMALIZE_WORKERS_ENV: &str = "NORMALIZE__WORKERS";
/// Environment variable for the per-table row buffer size
pub const BUFFER_MAX_ITEMS_ENV: &str = "DATA_WRITER__BUFFER_MAX_ITEMS";

/// Upper bound for worker counts, the runner sizes semaphores and channels from them
pub const MAX_WORKERS: usize = tokio::sync::Semaphore::MAX_PERMITS / 2;

/// Throughput knobs of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Resources drained concurrently
    pub extract_workers: usize,
    /// Pages normalized concurrently
    pub normalize_workers: usize,
    /// Rows buffered per table before a write
    pub buffer_max_items: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            extract_workers: 5,
            normalize_workers: 1,
            buffer_max_items: 5000,
        }
    }
}

impl PipelineSettings {
    /// Read settings from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings from the process environment over `defaults`
    pub fn from_env_over(defaults: Self) -> Result<Self> {
        Self::from_lookup_over(defaults, |key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`, falling back to defaults for unset keys
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_lookup_over(Self::default(), lookup)
    }

    /// Read settings through `lookup`, falling back to `defaults` for unset keys
    pub fn from_lookup_over<F>(defaults: Self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let settings = Self {
            extract_workers: read_count(&lookup, EXTRACT_WORKERS_ENV, defaults.extract_workers)?,
            normalize_workers: read_count(
                &lookup,
                NORMALIZE_WORKERS_ENV,
                defaults.normalize_workers,
            )?,
            buffer_max_items: read_count(&lookup, BUFFER_MAX_ITEMS_ENV, defaults.buffer_max_items)?,
        };
        for (key, value) in [
            (EXTRACT_WORKERS_ENV, settings.extract_workers),
            (NORMALIZE_WORKERS_ENV, settings.normalize_workers),
        ] {
            if value > MAX_WORKERS {
                return Err(too_many_workers(key));
            }
        }
        Ok(settings)
    }

    #[must_use]
    pub fn with_extract_workers(mut self, workers: usize) -> Self {
        self.extract_workers = workers;
        self
    }

    #[must_use]
    pub fn with_normalize_workers(mut self, workers: usize) -> Self {
        self.normalize_workers = workers;
        self
    }

    #[must_use]
    pub fn with_buffer_max_items(mut self, items: usize) -> Self {
        self.buffer_max_items = items;
        self
    }

    /// Check every value is at least one and worker counts stay below [`MAX_WORKERS`]
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("extract_workers", self.extract_workers),
            ("normalize_workers", self.normalize_workers),
            ("buffer_max_items", self.buffer_max_items),
        ] {
            if value == 0 {
                return Err(Error::invalid_value(field, "must be at least 1"));
            }
        }
        for (field, value) in [
            ("extract_workers", self.extract_workers),
            ("normalize_workers", self.normalize_workers),
        ] {
            if value > MAX_WORKERS {
                return Err(too_many_workers(field));
            }
        }
        Ok(())
    }
}

fn too_many_workers(field: &str) -> Error {
    Error::invalid_value(field, format!("must be at most {MAX_WORKERS}"))
}

fn read_count<F>(lookup: &F, key: &str, default: usize) -> Result<usize>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(default);
    }
    match raw.parse::<usize>() {
        Ok(0) => Err(Error::invalid_value(key, "must be at least 1")),
        Ok(n) => Ok(n),
        Err(_) => Err(Error::invalid_value(
            key,
            format!("expected a positive integer, got '{raw}'"),
        )),
    }
}

/// Identity and destination of a pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Pipeline name, recorded with every completed load
    pub pipeline_name: String,
    /// Schema the tables are created in
    pub dataset_name: String,
    /// DuckDB file, `<pipeline_name>.duckdb` unless set
    pub database_path: Option<PathBuf>,
    /// Nesting depth below which arrays become child tables
    pub max_table_nesting: usize,
    pub settings: PipelineSettings,
}

impl PipelineConfig {
    /// Create a config with default settings
    pub fn new(pipeline_name: impl Into<String>, dataset_name: impl Into<String>) -> Self {
        Self {
            pipeline_name: pipeline_name.into(),
            dataset_name: dataset_name.into(),
            database_path: None,
            max_table_nesting: 2,
            settings: PipelineSettings::default(),
        }
    }

    #[must_use]
    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_max_table_nesting(mut self, depth: usize) -> Self {
        self.max_table_nesting = depth;
        self
    }

    /// Resolved DuckDB file path
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}.duckdb", self.pipeline_name)))
    }

    /// Check names and settings
    pub fn validate(&self) -> Result<()> {
        if self.pipeline_name.trim().is_empty() {
            return Err(Error::missing_field("pipeline_name"));
        }
        if self.dataset_name.trim().is_empty() {
            return Err(Error::missing_field("dataset_name"));
        }
        self.settings.validate()
    }
}
