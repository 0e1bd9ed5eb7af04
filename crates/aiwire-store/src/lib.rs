//! Storage layer: typed column access over Arrow batches, DuckDB as a SQL source.

mod error;
pub mod reader;

pub use error::StoreError;
pub use reader::{ColumnReader, FromColumn};

#[cfg(feature = "duckdb")]
mod duck;
#[cfg(feature = "duckdb")]
pub use duck::DuckStore;
