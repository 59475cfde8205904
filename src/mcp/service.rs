//! MCP service implementation using rmcp.
//!
//! `LegService` exposes every tool in the registry. Listing and calling go
//! through the same [`Dispatcher`] the `invoke` CLI uses, so both front-ends
//! see identical names, parameters and results.

use crate::error::ToolkitError;
use crate::tools::dispatch::{Dispatcher, ToolOutcome};
use crate::tools::registry::ToolSpec;
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    model::{
        CallToolRequestParams, CallToolResult, Content, Implementation, JsonObject,
        ListToolsResult, PaginatedRequestParams, ProtocolVersion, ServerCapabilities, ServerInfo, Tool,
    },
    service::RequestContext,
};
use serde_json::{Value, json};
use std::sync::Arc;

const INSTRUCTIONS: &str = "Admin tools for the LEG (Lokale Elektrizitätsgemeinschaft) platform.\n\
\n\
## Areas\n\
- Registrations: search_registrations, get_registration, get_stats, street leaderboard and clusters\n\
- Communities: formation workflow, members, scheduled emails\n\
- Tenants: white-label municipality configs and outreach\n\
- Public data: ElCom tariffs, Energie Reporter, Sonnendach\n\
- Pipeline: VNB leads, funnel dashboard, scoring\n\
- Documents: LEG documents and billing periods\n\
\n\
## Results\n\
Domain failures such as an unknown ID come back as `{\"error\": \"...\"}`.\n\
Mutating tools are refused when the server runs with LEG_READONLY=true.";

/// MCP server over the shared tool registry.
#[derive(Clone)]
pub struct LegService {
    dispatcher: Arc<Dispatcher>,
}

impl LegService {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Tool descriptors for `tools/list`, in registry order.
    pub fn tool_descriptors(&self) -> Vec<Tool> {
        self.dispatcher.registry().iter().map(descriptor).collect()
    }

    /// Run one tool and render its result the way MCP clients receive it.
    pub async fn call(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<CallToolResult, McpError> {
        let outcome = self
            .dispatcher
            .dispatch(name, arguments.unwrap_or_default())
            .await;
        render(outcome)
    }
}

fn descriptor(spec: &ToolSpec) -> Tool {
    Tool::new(spec.name, spec.description, Arc::new(spec.input_schema()))
}

fn render(outcome: Result<ToolOutcome, ToolkitError>) -> Result<CallToolResult, McpError> {
    match outcome {
        Ok(outcome) => Ok(CallToolResult::success(vec![Content::text(pretty(
            &outcome.to_value(),
        ))])),
        Err(e) if e.is_dispatch() => Err(e.into()),
        Err(e) => Ok(CallToolResult::error(vec![Content::text(pretty(
            &json!({ "error": e.to_string() }),
        ))])),
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

impl ServerHandler for LegService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "leg-toolkit".to_owned(),
                title: Some("LEG Admin Tools".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(INSTRUCTIONS.to_string()),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        async move {
            Ok(ListToolsResult {
                meta: None,
                tools: self.tool_descriptors(),
                next_cursor: None,
            })
        }
    }

    fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move { self.call(&request.name, request.arguments).await }
    }
}
