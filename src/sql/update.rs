//! SET-clause composition for partial updates.

use super::SqlFragment;
use crate::db::params::SqlValue;
use crate::error::{ToolkitError, ToolkitResult};

/// Builds `UPDATE <table> SET ... WHERE <keys> RETURNING ...`.
///
/// Key columns take the first placeholders, then each present field in
/// insertion order. Timestamp columns set with [`stamp`](Self::stamp) are
/// assigned `NOW()` after the fields.
#[derive(Debug, Clone)]
pub struct UpdateBuilder {
    table: &'static str,
    keys: Vec<(&'static str, SqlValue)>,
    fields: Vec<(&'static str, SqlValue)>,
    stamps: Vec<&'static str>,
    returning: &'static str,
}

impl UpdateBuilder {
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            keys: Vec::new(),
            fields: Vec::new(),
            stamps: Vec::new(),
            returning: "*",
        }
    }

    /// Add a `column = $n` condition to the WHERE clause.
    pub fn key(mut self, column: &'static str, value: impl Into<SqlValue>) -> Self {
        self.keys.push((column, value.into()));
        self
    }

    /// Set `column` when a value is present; absent values are skipped.
    pub fn set<V: Into<SqlValue>>(mut self, column: &'static str, value: Option<V>) -> Self {
        if let Some(value) = value {
            self.fields.push((column, value.into()));
        }
        self
    }

    /// Assign `column = NOW()`.
    pub fn stamp(mut self, column: &'static str) -> Self {
        self.stamps.push(column);
        self
    }

    /// Assign `updated_at = NOW()`.
    pub fn touch(self) -> Self {
        self.stamp("updated_at")
    }

    pub fn returning(mut self, columns: &'static str) -> Self {
        self.returning = columns;
        self
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Fails with [`ToolkitError::NoFieldsToUpdate`] when no field is present.
    pub fn build(self) -> ToolkitResult<SqlFragment> {
        if self.fields.is_empty() {
            return Err(ToolkitError::NoFieldsToUpdate);
        }
        if self.keys.is_empty() {
            return Err(ToolkitError::internal(format!(
                "UPDATE {} requires at least one key column",
                self.table
            )));
        }

        let mut params = Vec::with_capacity(self.keys.len() + self.fields.len());

        let conditions = self
            .keys
            .into_iter()
            .map(|(column, value)| {
                params.push(value);
                format!("{} = ${}", column, params.len())
            })
            .collect::<Vec<_>>()
            .join(" AND ");

        let mut assignments = self
            .fields
            .into_iter()
            .map(|(column, value)| {
                params.push(value);
                format!("{} = ${}", column, params.len())
            })
            .collect::<Vec<_>>();
        assignments.extend(self.stamps.iter().map(|c| format!("{} = NOW()", c)));

        let sql = format!(
            "UPDATE {} SET {} WHERE {} RETURNING {}",
            self.table,
            assignments.join(", "),
            conditions,
            self.returning
        );
        Ok(SqlFragment::from_parts(sql, params))
    }
}
