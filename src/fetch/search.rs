//! Brave web search client.

use super::{ensure_success, join_url};
use crate::error::{ToolkitError, ToolkitResult};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

const SERVICE: &str = "Brave API";
pub const DEFAULT_RESULT_COUNT: i64 = 5;
pub const MAX_RESULT_COUNT: i64 = 10;

/// One normalized search result. Missing and `null` fields become empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    web: Option<WebResults>,
}

#[derive(Debug, Default, Deserialize)]
struct WebResults {
    #[serde(default)]
    results: Vec<SearchHit>,
}

/// Clamp a requested result count to `[1, 10]`.
pub fn clamp_count(count: i64) -> i64 {
    count.clamp(1, MAX_RESULT_COUNT)
}

/// Parse a search API response body into hits.
///
/// A body without `web.results` yields no hits.
pub fn parse_search_response(body: &str) -> ToolkitResult<Vec<SearchHit>> {
    let parsed: SearchResponse = serde_json::from_str(body)
        .map_err(|e| ToolkitError::upstream_parse(SERVICE, e.to_string()))?;
    Ok(parsed.web.map(|web| web.results).unwrap_or_default())
}

#[derive(Clone)]
pub struct BraveSearchClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl BraveSearchClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Fail with `BRAVE_API_KEY not configured` when no key is set.
    pub fn ensure_configured(&self) -> ToolkitResult<()> {
        if self.is_configured() {
            Ok(())
        } else {
            Err(ToolkitError::not_configured("BRAVE_API_KEY"))
        }
    }

    pub async fn search(&self, query: &str, count: i64) -> ToolkitResult<Vec<SearchHit>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ToolkitError::not_configured("BRAVE_API_KEY"))?;
        let count = clamp_count(count);

        debug!(query, count, "Web search");
        let response = self
            .http
            .get(join_url(&self.base_url, "res/v1/web/search"))
            .query(&[("q", query.to_string()), ("count", count.to_string())])
            .header(reqwest::header::ACCEPT, "application/json")
            .header("X-Subscription-Token", api_key)
            .send()
            .await?;

        let body = ensure_success(SERVICE, response).await?.text().await?;
        parse_search_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_count() {
        assert_eq!(clamp_count(0), 1);
        assert_eq!(clamp_count(-3), 1);
        assert_eq!(clamp_count(5), 5);
        assert_eq!(clamp_count(25), 10);
    }

    #[test]
    fn test_parse_results() {
        let body = r#"{
            "type": "search",
            "web": {
                "results": [
                    {"title": "LEG Baden", "url": "https://example.ch/leg", "description": "Lokale Elektrizitätsgemeinschaft", "age": "2d"},
                    {"title": "No description", "url": "https://example.ch/x"}
                ]
            }
        }"#;
        let hits = parse_search_response(body).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "LEG Baden");
        assert_eq!(hits[0].url, "https://example.ch/leg");
        assert_eq!(hits[1].description, "");
    }

    #[test]
    fn test_parse_null_fields() {
        let body = r#"{"web": {"results": [
            {"title": null, "url": "https://example.ch/a", "description": null}
        ]}}"#;
        let hits = parse_search_response(body).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].url, "https://example.ch/a");
        assert_eq!(hits[0].title, "");
        assert_eq!(hits[0].description, "");
    }

    #[test]
    fn test_parse_without_web_section() {
        assert!(parse_search_response(r#"{"type": "search"}"#).unwrap().is_empty());
    }

    #[test]
    fn test_parse_malformed() {
        let err = parse_search_response("<html>").unwrap_err();
        assert!(matches!(err, ToolkitError::UpstreamParse { .. }));
    }

    #[tokio::test]
    async fn test_missing_key() {
        let client = BraveSearchClient::new(reqwest::Client::new(), "http://127.0.0.1:9", Some(String::new()));
        assert!(!client.is_configured());
        let err = client.search("leg", 5).await.unwrap_err();
        assert_eq!(err.to_string(), "BRAVE_API_KEY not configured");
        assert!(err.is_domain());
    }
}
