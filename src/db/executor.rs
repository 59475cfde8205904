//! Query execution with timing and logging.

use super::{Database, QueryOutcome, Row};
use crate::error::ToolkitResult;
use crate::sql::SqlFragment;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Runs statements against the configured backend.
///
/// Every statement is checked for placeholder/parameter alignment before it
/// is sent, and logged with its elapsed time and row count.
#[derive(Clone)]
pub struct QueryExecutor {
    db: Arc<dyn Database>,
}

impl QueryExecutor {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Execute one statement.
    pub async fn query(&self, fragment: &SqlFragment) -> ToolkitResult<QueryOutcome> {
        fragment.check_placeholders()?;

        debug!(
            sql = %fragment.sql(),
            params = fragment.params().len(),
            "Executing query"
        );

        let start = Instant::now();
        let result = self.db.fetch(fragment).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(outcome) => info!(
                sql = %fragment.summary(),
                elapsed_ms,
                rows = outcome.row_count(),
                "Query executed"
            ),
            Err(e) => warn!(
                sql = %fragment.summary(),
                elapsed_ms,
                error = %e,
                "Query failed"
            ),
        }
        result
    }

    /// Execute and return all rows.
    pub async fn rows(&self, fragment: &SqlFragment) -> ToolkitResult<Vec<Row>> {
        Ok(self.query(fragment).await?.rows)
    }

    /// Execute and return the first row, if any.
    pub async fn first(&self, fragment: &SqlFragment) -> ToolkitResult<Option<Row>> {
        Ok(self.query(fragment).await?.into_first())
    }

    /// Execute statements in one transaction.
    pub async fn atomic(&self, fragments: &[SqlFragment]) -> ToolkitResult<Vec<QueryOutcome>> {
        for fragment in fragments {
            fragment.check_placeholders()?;
        }

        let start = Instant::now();
        let result = self.db.fetch_atomic(fragments).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(outcomes) => info!(
                statements = fragments.len(),
                elapsed_ms,
                rows = outcomes.iter().map(QueryOutcome::row_count).sum::<usize>(),
                "Transaction committed"
            ),
            Err(e) => warn!(
                statements = fragments.len(),
                elapsed_ms,
                error = %e,
                "Transaction rolled back"
            ),
        }
        result
    }

    pub async fn close(&self) {
        self.db.close().await;
    }
}
