//! Shared state handed to every tool handler.

use super::gate::MutationGate;
use crate::config::{
    Config, DEFAULT_BRAVE_API_URL, DEFAULT_DOCUMENT_SERVICE_URL, DEFAULT_OPENDATA_URL,
    DEFAULT_SPARQL_ENDPOINT,
};
use crate::db::{Database, PgDatabase, QueryExecutor};
use crate::error::ToolkitResult;
use crate::fetch::{
    BraveSearchClient, DocumentServiceClient, OpenDataClient, SparqlClient, http_client,
};
use std::sync::Arc;

/// Upstream service locations.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub brave_api_url: String,
    pub brave_api_key: Option<String>,
    pub sparql_endpoint: String,
    pub opendata_url: String,
    pub document_service_url: String,
}

impl Endpoints {
    pub fn from_config(config: &Config) -> Self {
        Self {
            brave_api_url: config.brave_api_url.clone(),
            brave_api_key: config.brave_api_key.clone(),
            sparql_endpoint: config.sparql_endpoint.clone(),
            opendata_url: config.opendata_url.clone(),
            document_service_url: config.document_service_url.clone(),
        }
    }

    /// Point every service at one base URL (used with a local test server).
    pub fn all_at(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            brave_api_url: base.to_string(),
            brave_api_key: None,
            sparql_endpoint: format!("{}/query", base),
            opendata_url: base.to_string(),
            document_service_url: base.to_string(),
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            brave_api_url: DEFAULT_BRAVE_API_URL.to_string(),
            brave_api_key: None,
            sparql_endpoint: DEFAULT_SPARQL_ENDPOINT.to_string(),
            opendata_url: DEFAULT_OPENDATA_URL.to_string(),
            document_service_url: DEFAULT_DOCUMENT_SERVICE_URL.to_string(),
        }
    }
}

/// Explicitly constructed process context: database, write gate, and
/// upstream clients. Tests build one around a fake [`Database`].
pub struct ToolContext {
    pub db: QueryExecutor,
    pub gate: MutationGate,
    pub search: BraveSearchClient,
    pub sparql: SparqlClient,
    pub opendata: OpenDataClient,
    pub documents: DocumentServiceClient,
}

impl ToolContext {
    pub fn new(
        db: Arc<dyn Database>,
        gate: MutationGate,
        endpoints: &Endpoints,
        http: reqwest::Client,
    ) -> Self {
        Self {
            db: QueryExecutor::new(db),
            gate,
            search: BraveSearchClient::new(
                http.clone(),
                endpoints.brave_api_url.clone(),
                endpoints.brave_api_key.clone(),
            ),
            sparql: SparqlClient::new(http.clone(), endpoints.sparql_endpoint.clone()),
            opendata: OpenDataClient::new(http.clone(), endpoints.opendata_url.clone()),
            documents: DocumentServiceClient::new(http, endpoints.document_service_url.clone()),
        }
    }

    pub fn from_config(config: &Config) -> ToolkitResult<Self> {
        let db = PgDatabase::new(
            config.database_url.clone(),
            config.max_connections,
            config.query_timeout_duration(),
        );
        let http = http_client(config.http_timeout_duration())?;

        Ok(Self::new(
            Arc::new(db),
            MutationGate::new(config.readonly),
            &Endpoints::from_config(config),
            http,
        ))
    }
}
