//! Streamable HTTP transport for the MCP server.

use super::{Transport, wait_for_signal};
use crate::auth::{BearerAuth, require_bearer};
use crate::config::ServeArgs;
use crate::error::{ToolkitError, ToolkitResult};
use crate::mcp::LegService;
use crate::tools::dispatch::Dispatcher;
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// SSE streams can keep the server alive indefinitely after a signal.
const GRACEFUL_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP transport: one MCP session per client, optional bearer-token guard.
pub struct HttpTransport {
    dispatcher: Arc<Dispatcher>,
    host: String,
    port: u16,
    endpoint: String,
    auth: Arc<BearerAuth>,
}

impl HttpTransport {
    pub fn new(dispatcher: Arc<Dispatcher>, args: &ServeArgs) -> ToolkitResult<Self> {
        let auth = BearerAuth::from_tokens(&args.auth_tokens).map_err(ToolkitError::config)?;
        Ok(Self {
            dispatcher,
            host: args.http_host.clone(),
            port: args.http_port,
            endpoint: args.mcp_endpoint.clone(),
            auth: Arc::new(auth),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn requires_auth(&self) -> bool {
        self.auth.is_enabled()
    }

    fn router(&self) -> axum::Router {
        let dispatcher = self.dispatcher.clone();
        let service = StreamableHttpService::new(
            move || Ok(LegService::new(dispatcher.clone())),
            LocalSessionManager::default().into(),
            Default::default(),
        );

        // nest_service rejects "/", so the root endpoint is served as fallback.
        let app = if self.endpoint == "/" {
            axum::Router::new().fallback_service(service)
        } else {
            axum::Router::new().nest_service(&self.endpoint, service)
        };

        if self.auth.is_enabled() {
            app.layer(axum::middleware::from_fn_with_state(
                self.auth.clone(),
                require_bearer,
            ))
        } else {
            app
        }
    }
}

impl Transport for HttpTransport {
    async fn run(&self) -> ToolkitResult<()> {
        let bind_addr = self.bind_addr();
        let app = self.router();

        let listener = TcpListener::bind(&bind_addr).await.map_err(|e| {
            ToolkitError::connection(
                format!("Failed to bind to {}: {}", bind_addr, e),
                "Check that the port is available",
            )
        })?;

        if !self.requires_auth() {
            warn!("No auth tokens configured; the HTTP endpoint is unauthenticated");
        }
        info!(
            addr = %bind_addr,
            endpoint = %self.endpoint,
            auth = self.requires_auth(),
            tools = self.dispatcher.registry().len(),
            "MCP endpoint ready"
        );

        let shutdown_notify = Arc::new(tokio::sync::Notify::new());
        let notify = shutdown_notify.clone();
        let shutdown_signal = async move {
            wait_for_signal().await;
            notify.notify_one();
        };

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal);

        let result = tokio::select! {
            result = server => {
                result.map_err(|e| {
                    error!(error = %e, "HTTP server error");
                    ToolkitError::internal(format!("HTTP server error: {}", e))
                })
            }
            _ = async {
                shutdown_notify.notified().await;
                info!(
                    timeout_secs = GRACEFUL_TIMEOUT.as_secs(),
                    "Waiting for connections to close (send signal again to force exit)"
                );
                tokio::select! {
                    _ = tokio::time::sleep(GRACEFUL_TIMEOUT) => {
                        warn!("Graceful shutdown timeout, forcing exit");
                    }
                    _ = wait_for_signal() => {
                        warn!("Received second signal, forcing immediate exit");
                    }
                }
            } => Ok(()),
        };

        info!("Closing database pool");
        self.dispatcher.shutdown().await;
        if result.is_ok() {
            info!("HTTP server stopped");
        }
        result
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
