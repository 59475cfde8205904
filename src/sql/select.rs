//! Filter composition for list and search queries.

use super::SqlFragment;
use crate::db::params::SqlValue;

/// Builds a SELECT from a base statement and optional filters.
///
/// Each present filter appends one condition and consumes the next
/// placeholder; absent filters add nothing.
///
/// ```ignore
/// let fragment = SelectBuilder::new("SELECT * FROM communities")
///     .eq("status", args.opt_text("status")?)
///     .order_by("created_at DESC")
///     .limit(50)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct SelectBuilder {
    sql: String,
    params: Vec<SqlValue>,
    has_where: bool,
}

impl SelectBuilder {
    /// Start from a base statement without a WHERE clause.
    pub fn new(base: &str) -> Self {
        Self {
            sql: base.trim_end().to_string(),
            params: Vec::new(),
            has_where: false,
        }
    }

    /// Start from a base statement that already ends in a WHERE clause;
    /// filters are appended with AND.
    pub fn filtered(base: &str) -> Self {
        Self {
            has_where: true,
            ..Self::new(base)
        }
    }

    fn next_placeholder(&self) -> String {
        format!("${}", self.params.len() + 1)
    }

    fn push_condition(&mut self, condition: &str) {
        self.sql
            .push_str(if self.has_where { " AND " } else { " WHERE " });
        self.sql.push_str(condition);
        self.has_where = true;
    }

    /// `column = $n` when a value is present.
    pub fn eq<V: Into<SqlValue>>(mut self, column: &str, value: Option<V>) -> Self {
        if let Some(value) = value {
            let placeholder = self.next_placeholder();
            self.push_condition(&format!("{} = {}", column, placeholder));
            self.params.push(value.into());
        }
        self
    }

    /// Case-insensitive substring match on any of `columns`, sharing one
    /// `%needle%` parameter.
    pub fn ilike_any(mut self, columns: &[&str], needle: Option<&str>) -> Self {
        if let Some(needle) = needle {
            if columns.is_empty() {
                return self;
            }
            let placeholder = self.next_placeholder();
            let alternatives = columns
                .iter()
                .map(|column| format!("{} ILIKE {}", column, placeholder))
                .collect::<Vec<_>>()
                .join(" OR ");
            self.push_condition(&format!("({})", alternatives));
            self.params.push(SqlValue::Text(format!("%{}%", needle)));
        }
        self
    }

    /// Static predicate without parameters, added only when `enabled`.
    pub fn condition_if(mut self, enabled: bool, condition: &str) -> Self {
        if enabled {
            self.push_condition(condition);
        }
        self
    }

    pub fn order_by(mut self, expr: &str) -> Self {
        self.sql.push_str(" ORDER BY ");
        self.sql.push_str(expr);
        self
    }

    /// Bind the row limit as the final parameter.
    pub fn limit(mut self, limit: i64) -> Self {
        let placeholder = self.next_placeholder();
        self.sql.push_str(" LIMIT ");
        self.sql.push_str(&placeholder);
        self.params.push(SqlValue::Int(limit));
        self
    }

    pub fn build(self) -> SqlFragment {
        SqlFragment::from_parts(self.sql, self.params)
    }
}
