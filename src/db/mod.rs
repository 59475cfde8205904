//! Database access layer.
//!
//! - `Database`: the backend seam (PostgreSQL in production, fakes in tests)
//! - Lazily connected PostgreSQL pool
//! - Query execution with timing and logging
//! - Parameter binding and row decoding

pub mod executor;
pub mod params;
pub mod pool;
pub mod types;

pub use executor::QueryExecutor;
pub use params::SqlValue;
pub use pool::PgDatabase;

use crate::error::ToolkitResult;
use crate::sql::SqlFragment;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// One decoded row, keyed by column name.
pub type Row = Map<String, Value>;

/// Rows produced by one statement.
///
/// Writes use `RETURNING`, so the row count of a write is the number of
/// rows it touched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutcome {
    pub rows: Vec<Row>,
}

impl QueryOutcome {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    pub fn into_first(self) -> Option<Row> {
        self.rows.into_iter().next()
    }
}

/// Backend that runs parameterized statements.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run one statement and return its rows.
    async fn fetch(&self, fragment: &SqlFragment) -> ToolkitResult<QueryOutcome>;

    /// Run statements in order inside one transaction. Any failure rolls
    /// back every statement.
    async fn fetch_atomic(&self, fragments: &[SqlFragment]) -> ToolkitResult<Vec<QueryOutcome>>;

    /// Release pooled connections.
    async fn close(&self) {}
}
