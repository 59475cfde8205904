//! Bearer-token guard for the HTTP transport.
//!
//! Tokens come from `--auth-token` / `LEG_AUTH_TOKENS`. With no tokens the
//! guard is not installed and the endpoint is open, which is only sensible
//! when binding to localhost.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::warn;

const BEARER_PREFIX: &str = "Bearer ";

/// Set of accepted bearer tokens.
#[derive(Debug, Clone, Default)]
pub struct BearerAuth {
    tokens: HashSet<String>,
}

impl BearerAuth {
    /// Build from configured tokens. Blank entries are a configuration error.
    pub fn from_tokens(tokens: &[String]) -> Result<Self, String> {
        let mut accepted = HashSet::new();
        for token in tokens {
            let trimmed = token.trim();
            if trimmed.is_empty() {
                return Err("Empty value in LEG_AUTH_TOKENS".to_string());
            }
            accepted.insert(trimmed.to_string());
        }
        Ok(Self { tokens: accepted })
    }

    pub fn is_enabled(&self) -> bool {
        !self.tokens.is_empty()
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Compare against every accepted token without short-circuiting.
    pub fn accepts(&self, provided: &str) -> bool {
        self.tokens.iter().fold(false, |found, expected| {
            found | constant_time_eq(provided.as_bytes(), expected.as_bytes())
        })
    }
}

/// Axum middleware rejecting requests without an accepted bearer token.
pub async fn require_bearer(
    State(auth): State<Arc<BearerAuth>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let token = match bearer_token(&request) {
        Ok(token) => token,
        Err(reason) => {
            warn!(reason, "Rejected HTTP request");
            return unauthorized(reason);
        }
    };

    if auth.accepts(token) {
        next.run(request).await
    } else {
        warn!(token = %mask_token(token), "Rejected HTTP request: unknown token");
        unauthorized("Invalid bearer token")
    }
}

fn bearer_token(request: &Request<Body>) -> Result<&str, &'static str> {
    let value = request
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or("Missing Authorization header")?
        .to_str()
        .map_err(|_| "Authorization header contains invalid characters")?;

    match value.strip_prefix(BEARER_PREFIX) {
        Some("") => Err("Bearer token is empty"),
        Some(token) => Ok(token),
        None => Err("Expected 'Authorization: Bearer <token>'"),
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && bool::from(a.ct_eq(b))
}

fn mask_token(token: &str) -> String {
    let prefix: String = token.chars().take(3).collect();
    if token.chars().count() <= 3 {
        "***".to_string()
    } else {
        format!("{}***", prefix)
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        axum::Json(json!({ "error": message })),
    )
        .into_response()
}
