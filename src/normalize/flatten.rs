//! Flattening of nested records into parent and child table rows

use serde_json::Value;
use std::collections::BTreeMap;

use super::naming::{join_path, normalize_identifier};
use crate::error::{Error, Result};
use crate::types::{JsonObject, Page, Row};

/// Load id column present on every row
pub const LOAD_ID_COLUMN: &str = "_load_id";
/// Row id column, unique within a load
pub const ROW_ID_COLUMN: &str = "_row_id";
/// Child row column pointing at the parent's row id
pub const PARENT_ID_COLUMN: &str = "_parent_id";
/// Child row column holding the element's position in the parent array
pub const LIST_INDEX_COLUMN: &str = "_list_idx";
/// Column holding scalar array elements
pub const VALUE_COLUMN: &str = "value";

/// Rows produced from one page, grouped by table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedPage {
    /// Resource the page came from
    pub resource: String,
    /// Page number within the resource's sequence
    pub page: usize,
    /// Records in the page
    pub records: usize,
    /// Rows per table, root table and child tables alike
    pub tables: BTreeMap<String, Vec<Row>>,
}

impl NormalizedPage {
    /// Total rows across all tables
    pub fn row_count(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }

    /// Rows destined for `table`
    pub fn rows(&self, table: &str) -> &[Row] {
        self.tables.get(table).map_or(&[], Vec::as_slice)
    }
}

/// Turns pages of nested JSON records into flat rows
#[derive(Debug, Clone)]
pub struct Normalizer {
    load_id: String,
    max_nesting: usize,
}

/// Where a row being built sits in the table tree
struct RowContext<'a> {
    table: &'a str,
    row_id: &'a str,
    depth: usize,
}

impl Normalizer {
    /// Create a normalizer stamping rows with `load_id`
    ///
    /// Arrays nested fewer than `max_nesting` tables deep become child
    /// tables; deeper ones are stored as JSON text.
    pub fn new(load_id: impl Into<String>, max_nesting: usize) -> Self {
        Self {
            load_id: load_id.into(),
            max_nesting,
        }
    }

    pub fn load_id(&self) -> &str {
        &self.load_id
    }

    pub fn max_nesting(&self) -> usize {
        self.max_nesting
    }

    /// Normalize every record of `page` for `table`
    pub fn normalize_page(&self, resource: &str, table: &str, page: &Page) -> Result<NormalizedPage> {
        let table = normalize_identifier(table);
        let mut out = NormalizedPage {
            resource: resource.to_string(),
            page: page.number,
            records: page.len(),
            tables: BTreeMap::new(),
        };

        for (idx, record) in page.records.iter().enumerate() {
            let row_id = format!("{}-{}-{}-{}", self.load_id, resource, page.number, idx);
            let ctx = RowContext {
                table: &table,
                row_id: &row_id,
                depth: 0,
            };
            let row = self.build_row(&ctx, record, &mut out.tables)?;
            out.tables.entry(table.clone()).or_default().push(row);
        }

        Ok(out)
    }

    /// Build the row for `value` and push rows of its child tables into `tables`
    fn build_row(
        &self,
        ctx: &RowContext<'_>,
        value: &Value,
        tables: &mut BTreeMap<String, Vec<Row>>,
    ) -> Result<Row> {
        let mut row = Row::new();
        match value {
            Value::Object(map) => self.flatten_object(ctx, "", map, &mut row, tables)?,
            other => {
                let mut wrapped = JsonObject::new();
                wrapped.insert(VALUE_COLUMN.to_string(), other.clone());
                self.flatten_object(ctx, "", &wrapped, &mut row, tables)?;
            }
        }
        row.insert(
            LOAD_ID_COLUMN.to_string(),
            Value::String(self.load_id.clone()),
        );
        row.insert(ROW_ID_COLUMN.to_string(), Value::String(ctx.row_id.to_string()));
        Ok(row)
    }

    fn flatten_object(
        &self,
        ctx: &RowContext<'_>,
        prefix: &str,
        map: &JsonObject,
        row: &mut Row,
        tables: &mut BTreeMap<String, Vec<Row>>,
    ) -> Result<()> {
        for (key, value) in map {
            let column = join_path(prefix, &normalize_identifier(key));
            match value {
                Value::Object(nested) => {
                    self.flatten_object(ctx, &column, nested, row, tables)?;
                }
                Value::Array(items) if ctx.depth < self.max_nesting => {
                    self.build_child_table(ctx, &column, items, tables)?;
                }
                Value::Array(_) => {
                    let text = serde_json::to_string(value)
                        .map_err(|e| Error::normalize(ctx.table, e.to_string()))?;
                    row.insert(column, Value::String(text));
                }
                scalar => {
                    row.insert(column, scalar.clone());
                }
            }
        }
        Ok(())
    }

    fn build_child_table(
        &self,
        ctx: &RowContext<'_>,
        column: &str,
        items: &[Value],
        tables: &mut BTreeMap<String, Vec<Row>>,
    ) -> Result<()> {
        let child_table = join_path(ctx.table, column);

        for (idx, item) in items.iter().enumerate() {
            let row_id = format!("{}-{}-{}", ctx.row_id, column, idx);
            let child_ctx = RowContext {
                table: &child_table,
                row_id: &row_id,
                depth: ctx.depth + 1,
            };
            let mut row = self.build_row(&child_ctx, item, tables)?;
            row.insert(
                PARENT_ID_COLUMN.to_string(),
                Value::String(ctx.row_id.to_string()),
            );
            row.insert(LIST_INDEX_COLUMN.to_string(), Value::from(idx));
            tables.entry(child_table.clone()).or_default().push(row);
        }
        Ok(())
    }
}
