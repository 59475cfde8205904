//! Process-wide write switch.

use crate::error::{ToolkitError, ToolkitResult};

/// Blocks every mutating tool when read-only mode is on.
///
/// Fixed at startup. Mutating handlers call [`check`](Self::check) before
/// touching the database or any downstream service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationGate {
    readonly: bool,
}

impl MutationGate {
    pub fn new(readonly: bool) -> Self {
        Self { readonly }
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    pub fn check(&self) -> ToolkitResult<()> {
        if self.readonly {
            Err(ToolkitError::MutationDisabled)
        } else {
            Ok(())
        }
    }
}
