//! Stdio transport for the MCP server.

use super::{Transport, wait_for_signal};
use crate::error::{ToolkitError, ToolkitResult};
use crate::mcp::LegService;
use crate::tools::dispatch::Dispatcher;
use rmcp::{ServiceExt, transport::stdio};
use std::sync::Arc;
use tracing::{info, warn};

/// Reads JSON-RPC messages from stdin and writes responses to stdout.
/// Logs go to stderr so they never corrupt the protocol stream.
pub struct StdioTransport {
    dispatcher: Arc<Dispatcher>,
}

impl StdioTransport {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }
}

impl Transport for StdioTransport {
    async fn run(&self) -> ToolkitResult<()> {
        info!(tools = self.dispatcher.registry().len(), "Starting MCP server on stdio");

        let service = LegService::new(self.dispatcher.clone());
        let running_service = service.serve(stdio()).await.map_err(|e| {
            ToolkitError::internal(format!("Failed to start stdio transport: {}", e))
        })?;

        let shutdown_requested = tokio::select! {
            result = running_service.waiting() => {
                if let Err(e) = result {
                    warn!(error = %e, "Stdio transport error");
                    self.dispatcher.shutdown().await;
                    return Err(ToolkitError::internal(format!("Stdio transport error: {}", e)));
                }
                info!("Client disconnected");
                false
            }
            _ = wait_for_signal() => {
                info!("Shutdown signal received (send again to force exit)");
                true
            }
        };

        if shutdown_requested {
            tokio::spawn(async {
                wait_for_signal().await;
                warn!("Received second signal, forcing immediate exit");
                std::process::exit(1);
            });
        }

        info!("Closing database pool");
        self.dispatcher.shutdown().await;

        if shutdown_requested {
            // The stdin reader cannot be interrupted, so leave explicitly.
            std::process::exit(0);
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdio"
    }
}
