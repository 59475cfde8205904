//! Error types for the LEG toolkit.
//!
//! All failures are modeled with `thiserror`. Domain failures (not found, nothing to update,
//! write access disabled, ...) are rendered by the dispatcher as `{"error": ...}` payloads;
//! everything else surfaces as a dispatch-level failure in the CLI and MCP front-ends.

use thiserror::Error;

/// Message returned by every mutating tool while the mutation gate is active.
pub const MUTATION_DISABLED_MESSAGE: &str = "Write access disabled (LEG_READONLY=true)";

#[derive(Error, Debug)]
pub enum ToolkitError {
    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("Missing required parameter '{parameter}' for tool '{tool}'")]
    MissingParameter { tool: String, parameter: String },

    #[error("Invalid value for parameter '{parameter}': {reason}")]
    InvalidParameter { parameter: String, reason: String },

    #[error("{}", MUTATION_DISABLED_MESSAGE)]
    MutationDisabled,

    #[error("{message}")]
    NotFound { message: String },

    #[error("No fields to update")]
    NoFieldsToUpdate,

    #[error("{message}")]
    Conflict { message: String },

    #[error("{setting} not configured")]
    NotConfigured { setting: String },

    #[error("{service} {status}: {body}")]
    Upstream {
        service: String,
        status: u16,
        body: String,
    },

    #[error("Malformed response from {service}: {message}")]
    UpstreamParse { service: String, message: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "23505" for unique violation
        sql_state: Option<String>,
        suggestion: String,
    },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u64,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ToolkitError {
    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Self::UnknownTool { name: name.into() }
    }

    pub fn missing_parameter(tool: impl Into<String>, parameter: impl Into<String>) -> Self {
        Self::MissingParameter {
            tool: tool.into(),
            parameter: parameter.into(),
        }
    }

    pub fn invalid_parameter(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Create a not-found failure with the exact message shown to callers.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn not_configured(setting: impl Into<String>) -> Self {
        Self::NotConfigured {
            setting: setting.into(),
        }
    }

    /// Create an upstream error from a non-success HTTP response.
    pub fn upstream(service: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::Upstream {
            service: service.into(),
            status,
            body: body.into(),
        }
    }

    pub fn upstream_parse(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UpstreamParse {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, elapsed_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Domain failures are reported to callers as `{"error": ...}` payloads
    /// rather than as failed invocations.
    pub fn is_domain(&self) -> bool {
        matches!(
            self,
            Self::MutationDisabled
                | Self::NotFound { .. }
                | Self::NoFieldsToUpdate
                | Self::Conflict { .. }
                | Self::NotConfigured { .. }
        )
    }

    /// Failures detected before a handler runs.
    pub fn is_dispatch(&self) -> bool {
        matches!(
            self,
            Self::UnknownTool { .. } | Self::MissingParameter { .. } | Self::InvalidParameter { .. }
        )
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Database { suggestion, .. } => Some(suggestion),
            Self::UnknownTool { .. } => Some("Run 'leg-toolkit invoke help' to list available tools"),
            _ => None,
        }
    }
}

/// Convert sqlx errors to ToolkitError.
impl From<sqlx::Error> for ToolkitError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => ToolkitError::connection(
                msg.to_string(),
                "Check DATABASE_URL format and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                ToolkitError::database(
                    db_err.message(),
                    code,
                    "Check that the referenced tables and columns exist",
                )
            }
            sqlx::Error::RowNotFound => ToolkitError::database(
                "No rows returned",
                None,
                "Verify the query conditions match existing data",
            ),
            sqlx::Error::PoolTimedOut => ToolkitError::timeout("connection pool acquire", 30),
            sqlx::Error::PoolClosed => {
                ToolkitError::connection("Connection pool is closed", "Restart the process")
            }
            sqlx::Error::Io(io_err) => ToolkitError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => ToolkitError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => ToolkitError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::ColumnDecode { index, source } => {
                ToolkitError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => {
                ToolkitError::internal(format!("Decode error: {}", source))
            }
            _ => ToolkitError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

impl From<reqwest::Error> for ToolkitError {
    fn from(err: reqwest::Error) -> Self {
        let service = err
            .url()
            .and_then(|u| u.host_str())
            .unwrap_or("upstream")
            .to_string();
        if err.is_timeout() {
            ToolkitError::timeout(format!("request to {}", service), 0)
        } else if err.is_decode() {
            ToolkitError::upstream_parse(service, err.to_string())
        } else {
            ToolkitError::connection(
                format!("Request to {} failed: {}", service, err),
                "Check network connectivity and the configured service URL",
            )
        }
    }
}

impl From<csv::Error> for ToolkitError {
    fn from(err: csv::Error) -> Self {
        ToolkitError::upstream_parse("opendata.swiss", err.to_string())
    }
}

/// Result type alias for toolkit operations.
pub type ToolkitResult<T> = Result<T, ToolkitError>;

/// Build suggestion data as JSON value.
fn suggestion_data(suggestion: Option<&str>) -> Option<serde_json::Value> {
    suggestion.map(|s| serde_json::json!({ "suggestion": s }))
}

/// Convert ToolkitError to MCP ErrorData for semantic error categorization.
impl From<ToolkitError> for rmcp::ErrorData {
    fn from(err: ToolkitError) -> Self {
        let data = suggestion_data(err.suggestion());
        match &err {
            ToolkitError::MissingParameter { .. } | ToolkitError::InvalidParameter { .. } => {
                rmcp::ErrorData::invalid_params(err.to_string(), data)
            }
            ToolkitError::UnknownTool { .. } => {
                rmcp::ErrorData::invalid_params(err.to_string(), data)
            }
            ToolkitError::NotFound { .. } => {
                rmcp::ErrorData::resource_not_found(err.to_string(), data)
            }
            ToolkitError::Database {
                message, sql_state, ..
            } => {
                let msg = match sql_state {
                    Some(code) => format!("{} (SQLSTATE: {})", message, code),
                    None => message.clone(),
                };
                rmcp::ErrorData::invalid_params(msg, data)
            }
            _ => rmcp::ErrorData::internal_error(err.to_string(), data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutation_disabled_message() {
        assert_eq!(
            ToolkitError::MutationDisabled.to_string(),
            "Write access disabled (LEG_READONLY=true)"
        );
    }

    #[test]
    fn test_upstream_display() {
        let err = ToolkitError::upstream("Brave API", 429, "rate limited");
        assert_eq!(err.to_string(), "Brave API 429: rate limited");
    }

    #[test]
    fn test_domain_classification() {
        assert!(ToolkitError::NoFieldsToUpdate.is_domain());
        assert!(ToolkitError::not_found("Not found").is_domain());
        assert!(ToolkitError::not_configured("BRAVE_API_KEY").is_domain());
        assert!(!ToolkitError::internal("boom").is_domain());
        assert!(!ToolkitError::unknown_tool("nope").is_domain());
        assert!(ToolkitError::unknown_tool("nope").is_dispatch());
    }

    #[test]
    fn test_not_configured_display() {
        assert_eq!(
            ToolkitError::not_configured("BRAVE_API_KEY").to_string(),
            "BRAVE_API_KEY not configured"
        );
    }

    #[test]
    fn test_unknown_tool_maps_to_invalid_params() {
        let mcp_err: rmcp::ErrorData = ToolkitError::unknown_tool("nope").into();
        assert_eq!(mcp_err.code.0, -32602);
        assert!(mcp_err.data.is_some());
    }

    #[test]
    fn test_missing_parameter_maps_to_invalid_params() {
        let mcp_err: rmcp::ErrorData =
            ToolkitError::missing_parameter("get_tenant", "territory").into();
        assert_eq!(mcp_err.code.0, -32602);
        assert!(mcp_err.message.contains("territory"));
    }

    #[test]
    fn test_not_found_maps_to_resource_not_found() {
        let mcp_err: rmcp::ErrorData = ToolkitError::not_found("Tenant not found").into();
        assert_eq!(mcp_err.code.0, -32002);
    }

    #[test]
    fn test_database_error_includes_sql_state() {
        let err = ToolkitError::database("duplicate key", Some("23505".to_string()), "check");
        let mcp_err: rmcp::ErrorData = err.into();
        assert!(mcp_err.message.contains("23505"));
        assert_eq!(mcp_err.data.unwrap()["suggestion"], "check");
    }

    #[test]
    fn test_upstream_maps_to_internal_error() {
        let mcp_err: rmcp::ErrorData = ToolkitError::upstream("LINDAS", 500, "down").into();
        assert_eq!(mcp_err.code.0, -32603);
    }
}
