//! DuckDB destination
//!
//! Tables live in a schema named after the dataset. Each write infers the
//! batch's column types, creates the table or evolves it (new columns are
//! added, existing ones widened) and inserts the rows in one transaction.

use chrono::Utc;
use duckdb::types::Value as DbValue;
use duckdb::{params_from_iter, Connection};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

use super::Destination;
use crate::error::{Error, Result};
use crate::schema::{
    infer_table_schema, normalize_timestamp, Column, DataType, TableSchema, TIMESTAMP_FORMAT,
};
use crate::types::Row;

/// Table recording completed loads
pub const LOADS_TABLE: &str = "_loads";

/// Status stored for a completed load
const LOAD_STATUS_COMPLETED: i64 = 0;

/// In-memory database location
pub const MEMORY: &str = ":memory:";

/// Destination writing into a DuckDB database file
pub struct DuckDbDestination {
    conn: Connection,
    dataset: String,
    location: String,
    /// Known table layouts, filled lazily from the catalog
    schemas: HashMap<String, TableSchema>,
}

impl DuckDbDestination {
    /// Open (or create) the database at `path` and prepare `dataset`
    pub fn open(path: impl AsRef<Path>, dataset: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        let location = path.display().to_string();
        let conn = if location == MEMORY {
            Connection::open_in_memory()
        } else {
            Connection::open(path)
        }
        .map_err(|e| Error::destination(format!("Failed to open DuckDB at {location}: {e}")))?;

        let destination = Self {
            conn,
            dataset: dataset.into(),
            location,
            schemas: HashMap::new(),
        };
        destination.prepare_dataset()?;
        Ok(destination)
    }

    /// Open a throwaway in-memory database
    pub fn in_memory(dataset: impl Into<String>) -> Result<Self> {
        Self::open(MEMORY, dataset)
    }

    fn prepare_dataset(&self) -> Result<()> {
        if self.dataset.trim().is_empty() {
            return Err(Error::missing_field("dataset_name"));
        }
        let sql = format!(
            "CREATE SCHEMA IF NOT EXISTS {schema};
             CREATE TABLE IF NOT EXISTS {loads} (
                 load_id VARCHAR NOT NULL,
                 pipeline_name VARCHAR,
                 status BIGINT NOT NULL,
                 inserted_at TIMESTAMP NOT NULL
             );",
            schema = quote_ident(&self.dataset),
            loads = self.qualified(LOADS_TABLE),
        );
        self.conn.execute_batch(&sql).map_err(|e| {
            Error::destination(format!(
                "Failed to prepare dataset '{}' in {}: {e}",
                self.dataset, self.location
            ))
        })?;
        debug!("Dataset {} ready in {}", self.dataset, self.location);
        Ok(())
    }

    /// Dataset-qualified, quoted table name
    fn qualified(&self, table: &str) -> String {
        format!("{}.{}", quote_ident(&self.dataset), quote_ident(table))
    }

    /// Current layout of `table`, `None` if it does not exist yet
    pub fn table_schema(&mut self, table: &str) -> Result<Option<TableSchema>> {
        if let Some(schema) = self.schemas.get(table) {
            return Ok(Some(schema.clone()));
        }

        let mut stmt = self.conn.prepare(
            "SELECT column_name, data_type FROM information_schema.columns
             WHERE table_schema = ? AND table_name = ?
             ORDER BY ordinal_position",
        )?;
        let columns = stmt
            .query_map([self.dataset.as_str(), table], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if columns.is_empty() {
            return Ok(None);
        }

        let mut schema = TableSchema::new(table);
        for (name, sql_type) in columns {
            let data_type = DataType::from_sql(&sql_type).unwrap_or(DataType::Text);
            schema.merge_column(Column::new(name, data_type));
        }
        self.schemas.insert(table.to_string(), schema.clone());
        Ok(Some(schema))
    }

    /// Statements bringing `existing` up to `incoming`, and the resulting layout
    fn plan_evolution(
        &self,
        table: &str,
        existing: Option<TableSchema>,
        incoming: &TableSchema,
    ) -> (Vec<String>, TableSchema) {
        let qualified = self.qualified(table);

        let Some(mut schema) = existing else {
            let columns: Vec<String> = incoming
                .columns()
                .iter()
                .map(|c| format!("{} {}", quote_ident(&c.name), c.data_type.sql_name()))
                .collect();
            let ddl = format!("CREATE TABLE {qualified} ({})", columns.join(", "));
            let mut schema = TableSchema::new(table);
            schema.merge(incoming);
            return (vec![ddl], schema);
        };

        let mut statements = Vec::new();
        for column in incoming.columns() {
            match schema.get(&column.name).map(|c| c.data_type) {
                None => statements.push(format!(
                    "ALTER TABLE {qualified} ADD COLUMN {} {}",
                    quote_ident(&column.name),
                    column.data_type.sql_name()
                )),
                Some(current) => {
                    let merged = current.merge_with(column.data_type);
                    if merged != current {
                        statements.push(format!(
                            "ALTER TABLE {qualified} ALTER COLUMN {} SET DATA TYPE {}",
                            quote_ident(&column.name),
                            merged.sql_name()
                        ));
                    }
                }
            }
            schema.merge_column(column.clone());
        }
        (statements, schema)
    }

    /// Rows currently stored in `table`
    pub fn row_count(&self, table: &str) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.qualified(table));
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Ids of completed loads, oldest first
    pub fn completed_loads(&self) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT load_id FROM {} ORDER BY inserted_at, load_id",
            self.qualified(LOADS_TABLE)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// Tables in the dataset, excluding bookkeeping tables
    pub fn tables(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT table_name FROM information_schema.tables
             WHERE table_schema = ? AND NOT starts_with(table_name, '_')
             ORDER BY table_name",
        )?;
        let tables = stmt
            .query_map([self.dataset.as_str()], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tables)
    }

    /// Underlying connection, for ad-hoc queries
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Destination for DuckDbDestination {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn location(&self) -> &str {
        &self.location
    }

    fn dataset(&self) -> &str {
        &self.dataset
    }

    fn write_rows(&mut self, table: &str, rows: &[Row]) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let incoming = infer_table_schema(table, rows);
        if incoming.is_empty() {
            debug!("Skipping {} rows for {}: no typed columns", rows.len(), table);
            return Ok(0);
        }

        let existing = self.table_schema(table)?;
        let created = existing.is_none();
        let (statements, schema) = self.plan_evolution(table, existing, &incoming);

        let columns: Vec<&Column> = incoming
            .columns()
            .iter()
            .filter_map(|c| schema.get(&c.name))
            .collect();
        let insert = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.qualified(table),
            columns
                .iter()
                .map(|c| quote_ident(&c.name))
                .collect::<Vec<_>>()
                .join(", "),
            columns
                .iter()
                .map(|c| format!("CAST(? AS {})", c.data_type.sql_name()))
                .collect::<Vec<_>>()
                .join(", "),
        );

        for statement in &statements {
            debug!("{}", statement);
            self.conn.execute_batch(statement)?;
        }
        // the cached layout must match the catalog even if the insert fails
        self.schemas.insert(table.to_string(), schema.clone());

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&insert)?;
            for row in rows {
                let values = columns
                    .iter()
                    .map(|c| to_db_value(row.get(&c.name), c.data_type));
                stmt.execute(params_from_iter(values))?;
            }
        }
        tx.commit()?;

        if created {
            info!("Created table {}.{}", self.dataset, table);
        }
        debug!("Wrote {} rows to {}.{}", rows.len(), self.dataset, table);
        Ok(rows.len())
    }

    fn complete_load(&mut self, load_id: &str, pipeline_name: &str) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} (load_id, pipeline_name, status, inserted_at) VALUES (?, ?, ?, CAST(? AS TIMESTAMP))",
            self.qualified(LOADS_TABLE)
        );
        let inserted_at = Utc::now().naive_utc().format(TIMESTAMP_FORMAT).to_string();
        self.conn.execute(
            &sql,
            duckdb::params![load_id, pipeline_name, LOAD_STATUS_COMPLETED, inserted_at],
        )?;
        Ok(())
    }
}

impl std::fmt::Debug for DuckDbDestination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckDbDestination")
            .field("location", &self.location)
            .field("dataset", &self.dataset)
            .finish_non_exhaustive()
    }
}

/// Quote an identifier for use in SQL
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Convert a JSON value into a parameter for a column of `target` type
fn to_db_value(value: Option<&Value>, target: DataType) -> DbValue {
    let Some(value) = value else {
        return DbValue::Null;
    };
    match value {
        Value::Null => DbValue::Null,
        Value::Bool(b) => DbValue::Boolean(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => DbValue::BigInt(i),
            None => n
                .as_f64()
                .map_or_else(|| DbValue::Text(n.to_string()), DbValue::Double),
        },
        Value::String(s) if target == DataType::Timestamp => {
            DbValue::Text(normalize_timestamp(s).unwrap_or_else(|| s.clone()))
        }
        Value::String(s) => DbValue::Text(s.clone()),
        other => DbValue::Text(other.to_string()),
    }
}
