//! Name-to-handler dispatch shared by both front-ends.

use super::args::RawArgs;
use super::context::ToolContext;
use super::registry::ToolRegistry;
use crate::error::{ToolkitError, ToolkitResult};
use futures_util::FutureExt;
use serde_json::{Value, json};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Result of a tool that ran.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Success(Value),
    /// Domain failure such as "Not found"; rendered as `{"error": ...}`.
    Failure(String),
}

impl ToolOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Success(value) => value.clone(),
            Self::Failure(message) => json!({ "error": message }),
        }
    }
}

pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    ctx: Arc<ToolContext>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>, ctx: Arc<ToolContext>) -> Self {
        Self { registry, ctx }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Resolve, coerce and run one tool.
    ///
    /// Domain failures come back as `Ok(ToolOutcome::Failure)`. Dispatch
    /// failures, unexpected errors and handler panics come back as `Err`.
    pub async fn dispatch(&self, name: &str, raw: RawArgs) -> ToolkitResult<ToolOutcome> {
        let spec = self
            .registry
            .get(name)
            .ok_or_else(|| ToolkitError::unknown_tool(name))?;
        let args = spec.coerce(raw)?;

        let start = Instant::now();
        let result = AssertUnwindSafe((spec.handler)(self.ctx.clone(), args))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(ToolkitError::internal(panic_message(panic.as_ref()))));
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(value) => {
                info!(tool = spec.name, elapsed_ms, outcome = "success", "Tool executed");
                Ok(ToolOutcome::Success(value))
            }
            Err(e) if e.is_domain() => {
                info!(tool = spec.name, elapsed_ms, outcome = "failure", error = %e, "Tool executed");
                Ok(ToolOutcome::Failure(e.to_string()))
            }
            Err(e) => {
                warn!(tool = spec.name, elapsed_ms, outcome = "error", error = %e, "Tool failed");
                Err(e)
            }
        }
    }

    /// Release the database pool.
    pub async fn shutdown(&self) {
        self.ctx.db.close().await;
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("tool panicked: {}", detail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_rendering() {
        let ok = ToolOutcome::Success(json!({"id": 1}));
        assert_eq!(ok.to_value(), json!({"id": 1}));
        assert!(!ok.is_failure());

        let failed = ToolOutcome::Failure("Not found".into());
        assert_eq!(failed.to_value(), json!({"error": "Not found"}));
        assert!(failed.is_failure());
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "tool panicked: boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bad row"));
        assert_eq!(panic_message(payload.as_ref()), "tool panicked: bad row");
        let payload: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(payload.as_ref()), "tool panicked: unknown panic");
    }
}
