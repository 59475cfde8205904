//! Safe composition of parameterized SQL.
//!
//! Values only ever travel as bound parameters. Column and table names are
//! `&'static str` literals owned by the tool handlers, never caller input.

pub mod fragment;
pub mod select;
pub mod update;

pub use fragment::SqlFragment;
pub use select::SelectBuilder;
pub use update::UpdateBuilder;

/// Upper bound for row limits on SQL list tools.
pub const MAX_LIST_LIMIT: i64 = 500;

/// Clamp a caller-supplied row limit to `[1, MAX_LIST_LIMIT]`.
pub fn clamp_limit(limit: i64) -> i64 {
    limit.clamp(1, MAX_LIST_LIMIT)
}
