//! DuckDB as a SQL source of Arrow batches.

use std::path::Path;

use arrow::record_batch::RecordBatch;
use duckdb::Connection;
use tracing::{debug, info};

use crate::StoreError;

/// DuckDB connection that returns query results as Arrow RecordBatches.
///
/// Supports both in-memory (ephemeral) and persistent (file-backed) modes.
/// Read typed cells out of the results with [`ColumnReader`](crate::ColumnReader).
pub struct DuckStore {
    conn: Connection,
}

impl DuckStore {
    /// Open an in-memory DuckDB database.
    pub fn open() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Open or create a persistent DuckDB database at the given path.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "opened duckdb database");
        Ok(Self { conn })
    }

    /// Run one or more statements that return no rows.
    pub fn execute(&self, sql: &str) -> Result<(), StoreError> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    /// Execute arbitrary SQL and return Arrow RecordBatches.
    pub fn query_arrow(&self, sql: &str) -> Result<Vec<RecordBatch>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let batches: Vec<RecordBatch> = stmt.query_arrow([])?.collect();
        let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
        debug!(rows, batches = batches.len(), "query complete");
        Ok(batches)
    }

    /// First non-empty batch of a query, or [`StoreError::NoResults`].
    pub fn query_one(&self, sql: &str) -> Result<RecordBatch, StoreError> {
        self.query_arrow(sql)?
            .into_iter()
            .find(|b| b.num_rows() > 0)
            .ok_or(StoreError::NoResults)
    }
}
