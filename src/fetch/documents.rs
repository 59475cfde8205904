//! Client for the downstream document-generation service.

use super::join_url;
use crate::error::{ToolkitError, ToolkitResult};
use serde_json::{Value, json};
use tracing::{info, warn};

const SERVICE: &str = "document service";

#[derive(Clone)]
pub struct DocumentServiceClient {
    http: reqwest::Client,
    base_url: String,
}

impl DocumentServiceClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Ask the service to render a document for a community.
    ///
    /// The JSON response is returned as-is, including error bodies.
    pub async fn generate(&self, community_id: &str, doc_type: &str) -> ToolkitResult<Value> {
        let response = self
            .http
            .post(join_url(&self.base_url, "api/formation/generate-document"))
            .json(&json!({ "community_id": community_id, "doc_type": doc_type }))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            info!(community_id, doc_type, "Document generation requested");
        } else {
            warn!(community_id, doc_type, status = status.as_u16(), "Document service returned an error");
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ToolkitError::upstream_parse(SERVICE, e.to_string()))
    }
}
