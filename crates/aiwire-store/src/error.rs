use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no results for query")]
    NoResults,

    #[error("column not found: {0}")]
    ColumnNotFound(String),

    #[error("row {row} out of bounds ({rows} rows)")]
    RowOutOfBounds { row: usize, rows: usize },

    #[error("column '{column}' is {actual}, cannot read as {expected}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        actual: String,
    },

    #[cfg(feature = "duckdb")]
    #[error("duckdb error: {0}")]
    DuckDb(#[from] ::duckdb::Error),
}
