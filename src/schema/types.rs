//! Schema types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Column type of a destination table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Bigint,
    Double,
    Boolean,
    Date,
    Timestamp,
    Text,
}

impl DataType {
    /// Merge two types, returning the more general type
    pub fn merge_with(self, other: DataType) -> DataType {
        match (self, other) {
            (a, b) if a == b => a,
            (DataType::Bigint, DataType::Double) | (DataType::Double, DataType::Bigint) => {
                DataType::Double
            }
            (DataType::Date, DataType::Timestamp) | (DataType::Timestamp, DataType::Date) => {
                DataType::Timestamp
            }
            // Incompatible types - fall back to text
            _ => DataType::Text,
        }
    }

    /// SQL type name used in DDL and casts
    pub fn sql_name(self) -> &'static str {
        match self {
            DataType::Bigint => "BIGINT",
            DataType::Double => "DOUBLE",
            DataType::Boolean => "BOOLEAN",
            DataType::Date => "DATE",
            DataType::Timestamp => "TIMESTAMP",
            DataType::Text => "VARCHAR",
        }
    }

    /// Map a type name reported by the database back to a column type
    pub fn from_sql(name: &str) -> Option<DataType> {
        let upper = name.trim().to_ascii_uppercase();
        let data_type = match upper.as_str() {
            "BIGINT" | "INTEGER" | "INT" | "SMALLINT" | "TINYINT" | "HUGEINT" => DataType::Bigint,
            "DOUBLE" | "FLOAT" | "REAL" => DataType::Double,
            "BOOLEAN" | "BOOL" => DataType::Boolean,
            "DATE" => DataType::Date,
            "VARCHAR" | "TEXT" | "STRING" => DataType::Text,
            s if s.starts_with("TIMESTAMP") => DataType::Timestamp,
            s if s.starts_with("DECIMAL") => DataType::Double,
            _ => return None,
        };
        Some(data_type)
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.sql_name())
    }
}

/// One column of a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    /// Missing or null in at least one row
    pub nullable: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: false,
        }
    }
}

/// Columns of one table, in order of first appearance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    columns: Vec<Column>,
    index: HashMap<String, usize>,
}

impl TableSchema {
    /// Create an empty schema for `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Get a column by name
    pub fn get(&self, name: &str) -> Option<&Column> {
        self.index.get(name).map(|&i| &self.columns[i])
    }

    /// Column names in order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Add a column, or merge its type into an existing one
    ///
    /// Returns the resulting type of the column.
    pub fn merge_column(&mut self, column: Column) -> DataType {
        if let Some(&i) = self.index.get(&column.name) {
            let existing = &mut self.columns[i];
            existing.data_type = existing.data_type.merge_with(column.data_type);
            existing.nullable |= column.nullable;
            existing.data_type
        } else {
            let data_type = column.data_type;
            self.index.insert(column.name.clone(), self.columns.len());
            self.columns.push(column);
            data_type
        }
    }

    /// Merge every column of `other` into this schema
    pub fn merge(&mut self, other: &TableSchema) {
        for column in &other.columns {
            self.merge_column(column.clone());
        }
    }

    pub(crate) fn mark_nullable(&mut self, name: &str) {
        if let Some(&i) = self.index.get(name) {
            self.columns[i].nullable = true;
        }
    }
}
