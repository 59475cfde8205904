//! Clients for the upstream HTTP services.
//!
//! Each client is a stateless request/response wrapper around a shared
//! `reqwest::Client` with its own response parser. Base URLs come from
//! configuration so tests can point them at a local server.

pub mod documents;
pub mod opendata;
pub mod search;
pub mod sparql;

pub use documents::DocumentServiceClient;
pub use opendata::OpenDataClient;
pub use search::{BraveSearchClient, SearchHit};
pub use sparql::SparqlClient;

use crate::error::{ToolkitError, ToolkitResult};
use std::time::Duration;
use tracing::warn;

const USER_AGENT: &str = concat!("leg-toolkit/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client shared by all upstream clients.
pub fn http_client(timeout: Duration) -> ToolkitResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| ToolkitError::config(format!("Failed to build HTTP client: {}", e)))
}

/// Pass a 2xx response through; anything else becomes `Upstream` with the
/// response body.
pub(crate) async fn ensure_success(
    service: &str,
    response: reqwest::Response,
) -> ToolkitResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    warn!(service, status = status.as_u16(), "Upstream request failed");
    Err(ToolkitError::upstream(service, status.as_u16(), body))
}

/// Join a base URL and a path without doubling the slash.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
