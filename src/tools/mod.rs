//! Tool registry, dispatcher and the tool handlers.
//!
//! - `schema`, `args`: parameter declarations and coerced arguments
//! - `registry`, `dispatch`: one registry shared by CLI and MCP server
//! - `gate`: the process-wide write switch
//! - `context`: database, gate and upstream clients handed to handlers
//! - handler groups: `registrations`, `communities`, `tenants`, `research`,
//!   `public_data`, `pipeline`, `documents`

pub mod args;
pub mod context;
pub mod dispatch;
pub mod gate;
pub(crate) mod macros;
pub mod registry;
pub mod schema;

pub mod communities;
pub mod documents;
pub mod pipeline;
pub mod public_data;
pub mod registrations;
pub mod research;
pub mod tenants;

pub use args::{ParsedArgs, RawArgs, parse_cli_args};
pub use context::{Endpoints, ToolContext};
pub use dispatch::{Dispatcher, ToolOutcome};
pub use gate::MutationGate;
pub use registry::{Handler, ToolRegistry, ToolSpec};
pub use schema::{ParamSpec, ParamType, Presence};

use crate::db::Row;
use crate::error::{ToolkitError, ToolkitResult};
use crate::sql::clamp_limit;
use serde_json::Value;

pub(crate) fn rows_value(rows: Vec<Row>) -> Value {
    Value::Array(rows.into_iter().map(Value::Object).collect())
}

/// The row, or the domain failure `message` when there is none.
pub(crate) fn row_or(row: Option<Row>, message: &str) -> ToolkitResult<Value> {
    row.map(Value::Object)
        .ok_or_else(|| ToolkitError::not_found(message))
}

/// The clamped `limit` argument.
pub(crate) fn limit_arg(args: &ParsedArgs) -> ToolkitResult<i64> {
    Ok(clamp_limit(args.integer("limit")?))
}
