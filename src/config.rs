//! Configuration handling for the LEG toolkit.
//!
//! Everything is read once at startup from CLI arguments with environment fallbacks.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::time::Duration;
use url::Url;

pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_MCP_ENDPOINT: &str = "/";
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_BRAVE_API_URL: &str = "https://api.search.brave.com";
pub const DEFAULT_SPARQL_ENDPOINT: &str = "https://lindas.admin.ch/query";
pub const DEFAULT_OPENDATA_URL: &str = "https://opendata.swiss";
pub const DEFAULT_DOCUMENT_SERVICE_URL: &str = "http://flask:5000";

/// Transport mode for the MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportMode {
    /// Standard input/output (for CLI integration)
    #[default]
    Stdio,
    /// Streamable HTTP with Server-Sent Events (for web clients)
    Http,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::Http => write!(f, "http"),
        }
    }
}

/// Options for `serve`.
#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Transport mode (stdio or http)
    #[arg(
        short,
        long,
        value_enum,
        default_value = "stdio",
        env = "LEG_TRANSPORT"
    )]
    pub transport: TransportMode,

    /// HTTP host to bind to (only used with http transport)
    #[arg(long, default_value = DEFAULT_HTTP_HOST, env = "LEG_HTTP_HOST")]
    pub http_host: String,

    /// HTTP port to bind to (only used with http transport)
    #[arg(long, default_value_t = DEFAULT_HTTP_PORT, env = "LEG_HTTP_PORT")]
    pub http_port: u16,

    /// MCP endpoint path (only used with http transport)
    #[arg(long, default_value = DEFAULT_MCP_ENDPOINT, env = "LEG_MCP_ENDPOINT")]
    pub mcp_endpoint: String,

    /// Bearer tokens accepted by the HTTP transport.
    /// When set, every HTTP request must carry one of them.
    #[arg(
        long = "auth-token",
        value_name = "TOKEN",
        env = "LEG_AUTH_TOKENS",
        value_delimiter = ','
    )]
    pub auth_tokens: Vec<String>,
}

impl ServeArgs {
    /// Get the HTTP bind address.
    pub fn http_bind_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}

impl Default for ServeArgs {
    fn default() -> Self {
        Self {
            transport: TransportMode::Stdio,
            http_host: DEFAULT_HTTP_HOST.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            mcp_endpoint: DEFAULT_MCP_ENDPOINT.to_string(),
            auth_tokens: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the MCP tool server
    Serve(ServeArgs),

    /// Invoke one tool: invoke <tool> [--key value]...
    Invoke {
        /// Tool name (or "help")
        tool: Option<String>,

        /// Tool arguments as --key value pairs
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// List all registered tools with their parameters
    Tools,
}

/// Configuration for the LEG toolkit.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "leg-toolkit",
    about = "Admin CLI and MCP tool server for the LEG platform",
    version,
    author,
    arg_required_else_help = true
)]
pub struct Config {
    #[command(subcommand)]
    pub command: Command,

    /// PostgreSQL connection string
    #[arg(long, value_name = "URL", env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Maximum pooled database connections
    #[arg(long, default_value_t = DEFAULT_MAX_CONNECTIONS, env = "LEG_MAX_CONNECTIONS")]
    pub max_connections: u32,

    /// Statement timeout in seconds
    #[arg(long, default_value_t = DEFAULT_QUERY_TIMEOUT_SECS, env = "LEG_QUERY_TIMEOUT")]
    pub query_timeout: u64,

    /// Upstream HTTP request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_HTTP_TIMEOUT_SECS, env = "LEG_HTTP_TIMEOUT")]
    pub http_timeout: u64,

    /// Disable every mutating tool
    #[arg(long, env = "LEG_READONLY")]
    pub readonly: bool,

    /// Brave Search API key
    #[arg(long, env = "BRAVE_API_KEY", hide_env_values = true)]
    pub brave_api_key: Option<String>,

    /// Brave Search API base URL
    #[arg(long, default_value = DEFAULT_BRAVE_API_URL, env = "BRAVE_API_URL")]
    pub brave_api_url: String,

    /// LINDAS SPARQL endpoint
    #[arg(long, default_value = DEFAULT_SPARQL_ENDPOINT, env = "LINDAS_SPARQL_URL")]
    pub sparql_endpoint: String,

    /// opendata.swiss CKAN base URL
    #[arg(long, default_value = DEFAULT_OPENDATA_URL, env = "OPENDATA_URL")]
    pub opendata_url: String,

    /// Base URL of the document generation service
    #[arg(long, default_value = DEFAULT_DOCUMENT_SERVICE_URL, env = "DOCUMENT_SERVICE_URL")]
    pub document_service_url: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LEG_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "LEG_JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            command: Command::Tools,
            database_url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            query_timeout: DEFAULT_QUERY_TIMEOUT_SECS,
            http_timeout: DEFAULT_HTTP_TIMEOUT_SECS,
            readonly: false,
            brave_api_key: None,
            brave_api_url: DEFAULT_BRAVE_API_URL.to_string(),
            sparql_endpoint: DEFAULT_SPARQL_ENDPOINT.to_string(),
            opendata_url: DEFAULT_OPENDATA_URL.to_string(),
            document_service_url: DEFAULT_DOCUMENT_SERVICE_URL.to_string(),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }

    /// Check values clap cannot check on its own.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_connections == 0 {
            return Err("max_connections must be greater than 0".to_string());
        }
        for (name, value) in [
            ("brave-api-url", &self.brave_api_url),
            ("sparql-endpoint", &self.sparql_endpoint),
            ("opendata-url", &self.opendata_url),
            ("document-service-url", &self.document_service_url),
        ] {
            let url = Url::parse(value).map_err(|e| format!("Invalid --{name} '{value}': {e}"))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(format!("--{name} must be an http(s) URL, got '{value}'"));
            }
        }
        Ok(())
    }

    /// Get the statement timeout as a Duration.
    pub fn query_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.query_timeout)
    }

    /// Get the upstream HTTP timeout as a Duration.
    pub fn http_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.http_timeout)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}
