//! Buffered writes into a destination

use std::collections::BTreeMap;
use tracing::debug;

use crate::destination::Destination;
use crate::error::Result;
use crate::normalize::NormalizedPage;
use crate::types::Row;

/// Per-table row buffers in front of a destination
///
/// A table's buffer is written out once it holds `max_items` rows; the rest
/// goes out with [`TableBuffers::flush_all`].
pub(crate) struct TableBuffers {
    destination: Box<dyn Destination>,
    max_items: usize,
    buffers: BTreeMap<String, Vec<Row>>,
    written: BTreeMap<String, usize>,
}

impl TableBuffers {
    pub(crate) fn new(destination: Box<dyn Destination>, max_items: usize) -> Self {
        Self {
            destination,
            max_items: max_items.max(1),
            buffers: BTreeMap::new(),
            written: BTreeMap::new(),
        }
    }

    /// Buffer the rows of one normalized page
    pub(crate) fn push(&mut self, page: NormalizedPage) -> Result<()> {
        for (table, rows) in page.tables {
            let buffer = self.buffers.entry(table.clone()).or_default();
            buffer.extend(rows);
            if buffer.len() >= self.max_items {
                self.flush(&table)?;
            }
        }
        Ok(())
    }

    fn flush(&mut self, table: &str) -> Result<()> {
        let Some(rows) = self.buffers.remove(table) else {
            return Ok(());
        };
        if rows.is_empty() {
            return Ok(());
        }
        debug!("Flushing {} rows to {}", rows.len(), table);
        let count = self.destination.write_rows(table, &rows)?;
        *self.written.entry(table.to_string()).or_insert(0) += count;
        Ok(())
    }

    /// Write out every remaining buffer
    pub(crate) fn flush_all(&mut self) -> Result<()> {
        let tables: Vec<String> = self.buffers.keys().cloned().collect();
        for table in tables {
            self.flush(&table)?;
        }
        Ok(())
    }

    /// Rows still waiting in buffers
    pub(crate) fn pending(&self) -> usize {
        self.buffers.values().map(Vec::len).sum()
    }

    /// Rows written so far per table
    pub(crate) fn written(&self) -> &BTreeMap<String, usize> {
        &self.written
    }

    pub(crate) fn into_parts(self) -> (Box<dyn Destination>, BTreeMap<String, usize>) {
        (self.destination, self.written)
    }
}
