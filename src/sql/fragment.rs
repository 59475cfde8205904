//! SQL text with its positional parameters.

use crate::db::params::SqlValue;
use crate::error::{ToolkitError, ToolkitResult};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::tokenizer::{Token, Tokenizer};
use std::collections::BTreeSet;

/// A statement using `$n` placeholders plus the values bound to them, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlFragment {
    sql: String,
    params: Vec<SqlValue>,
}

impl SqlFragment {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub(crate) fn from_parts(sql: String, params: Vec<SqlValue>) -> Self {
        Self { sql, params }
    }

    /// Append the value for the next placeholder.
    pub fn bind(mut self, value: impl Into<SqlValue>) -> Self {
        self.params.push(value.into());
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    /// Distinct placeholder indices referenced by the SQL text.
    ///
    /// Tokenizing keeps `$` characters inside string literals and
    /// dollar-quoted bodies from being counted.
    pub fn placeholder_indices(&self) -> ToolkitResult<BTreeSet<usize>> {
        let dialect = PostgreSqlDialect {};
        let tokens = Tokenizer::new(&dialect, &self.sql)
            .tokenize()
            .map_err(|e| ToolkitError::internal(format!("Unparseable SQL: {}", e)))?;

        Ok(tokens
            .into_iter()
            .filter_map(|token| match token {
                Token::Placeholder(p) => p.strip_prefix('$').and_then(|n| n.parse().ok()),
                _ => None,
            })
            .collect())
    }

    /// Verify that placeholders `$1..$n` are all referenced and that exactly
    /// `n` parameters are bound.
    pub fn check_placeholders(&self) -> ToolkitResult<()> {
        let indices = self.placeholder_indices()?;
        let expected: BTreeSet<usize> = (1..=self.params.len()).collect();
        if indices != expected {
            return Err(ToolkitError::internal(format!(
                "SQL references placeholders {:?} but {} parameters are bound",
                indices,
                self.params.len()
            )));
        }
        Ok(())
    }

    /// First line of the statement, whitespace collapsed, for log output.
    pub fn summary(&self) -> String {
        let collapsed = self.sql.split_whitespace().collect::<Vec<_>>().join(" ");
        match collapsed.char_indices().nth(80) {
            Some((idx, _)) => format!("{}...", &collapsed[..idx]),
            None => collapsed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_appends_in_order() {
        let fragment = SqlFragment::new("SELECT * FROM buildings WHERE building_id = $1 AND plz = $2")
            .bind("b-1")
            .bind("5400");
        assert_eq!(
            fragment.params(),
            &[SqlValue::Text("b-1".into()), SqlValue::Text("5400".into())]
        );
        assert!(fragment.check_placeholders().is_ok());
    }

    #[test]
    fn test_reused_placeholder_counts_once() {
        let fragment =
            SqlFragment::new("SELECT 1 WHERE (address ILIKE $1 OR email ILIKE $1)").bind("%x%");
        assert_eq!(fragment.placeholder_indices().unwrap().len(), 1);
        assert!(fragment.check_placeholders().is_ok());
    }

    #[test]
    fn test_dollar_in_string_literal_is_ignored() {
        let fragment = SqlFragment::new("SELECT 'costs $5' WHERE id = $1").bind(1_i64);
        assert!(fragment.check_placeholders().is_ok());
    }

    #[test]
    fn test_cast_after_placeholder() {
        let fragment = SqlFragment::new(
            "SELECT * FROM community_members WHERE invited_at < NOW() - make_interval(days => $1::int)",
        )
        .bind(7_i64);
        assert!(fragment.check_placeholders().is_ok());
    }

    #[test]
    fn test_missing_parameter_detected() {
        let fragment = SqlFragment::new("SELECT * FROM t WHERE a = $1 AND b = $2").bind(1_i64);
        let err = fragment.check_placeholders().unwrap_err();
        assert!(err.to_string().contains("1 parameters"));
    }

    #[test]
    fn test_gap_in_placeholders_detected() {
        let fragment = SqlFragment::new("SELECT * FROM t WHERE a = $2")
            .bind(1_i64)
            .bind(2_i64);
        assert!(fragment.check_placeholders().is_err());
    }

    #[test]
    fn test_summary_collapses_whitespace() {
        let fragment = SqlFragment::new("SELECT *\n    FROM buildings\n   WHERE 1=1");
        assert_eq!(fragment.summary(), "SELECT * FROM buildings WHERE 1=1");

        let long = SqlFragment::new("x".repeat(120));
        assert_eq!(long.summary().len(), 83);
    }
}
