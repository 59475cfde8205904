//! Local axum server standing in for the search, SPARQL, open-data and
//! document services.

#![allow(dead_code)]

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::TcpListener;

pub const API_KEY: &str = "test-key";

#[derive(Default)]
struct MockState {
    base_url: String,
    partner_scans: AtomicUsize,
}

fn hit(url: &str) -> Value {
    json!({ "title": url, "url": url, "description": "LEG partner" })
}

async fn search(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, (StatusCode, String)> {
    if headers.get("X-Subscription-Token").and_then(|v| v.to_str().ok()) != Some(API_KEY) {
        return Err((StatusCode::UNAUTHORIZED, "bad token".into()));
    }
    let query = params.get("q").cloned().unwrap_or_default();
    if query.contains("broken") {
        return Err((StatusCode::BAD_GATEWAY, "upstream down".into()));
    }
    if query.contains("sparse") {
        return Ok(Json(json!({ "web": { "results": [
            { "title": null, "url": "https://example.ch/sparse", "description": null },
            { "title": "No description", "url": "https://example.ch/other" }
        ] } })));
    }
    if query.contains("leghub.ch partner") {
        let hits = match state.partner_scans.fetch_add(1, Ordering::SeqCst) {
            0 => vec![hit("https://leghub.ch/a"), hit("https://leghub.ch/b")],
            _ => vec![hit("https://leghub.ch/b"), hit("https://leghub.ch/c")],
        };
        return Ok(Json(json!({ "web": { "results": hits } })));
    }
    let count: usize = params.get("count").and_then(|c| c.parse().ok()).unwrap_or(5);
    let results: Vec<Value> = (0..count)
        .map(|i| hit(&format!("https://example.ch/{}", i)))
        .collect();
    Ok(Json(json!({ "web": { "results": results } })))
}

async fn sparql(body: String) -> Json<Value> {
    let bindings = if body.contains("elcom") {
        json!([
            {
                "operator": { "type": "literal", "value": "Regionalwerke AG Baden" },
                "category": { "type": "literal", "value": "H4" },
                "total": { "type": "literal", "value": "27.5" },
                "energy": { "type": "literal", "value": "12.1" },
                "grid": { "type": "literal", "value": "10.4" }
            }
        ])
    } else {
        json!([
            {
                "bfs": { "type": "literal", "value": "4021" },
                "name": { "type": "literal", "value": "Baden" },
                "canton": { "type": "uri", "value": "https://ld.admin.ch/canton/AG" },
                "population": { "type": "literal", "value": "19500" }
            }
        ])
    };
    Json(json!({ "head": { "vars": [] }, "results": { "bindings": bindings } }))
}

async fn package_show(State(state): State<Arc<MockState>>) -> Json<Value> {
    Json(json!({
        "success": true,
        "result": {
            "resources": [
                { "name": "Dokumentation", "format": "PDF", "url": format!("{}/files/doc.pdf", state.base_url) },
                { "name": { "de": "Gemeinden" }, "format": "CSV", "url": format!("{}/files/gemeinden.csv", state.base_url) }
            ]
        }
    }))
}

async fn csv_file() -> &'static str {
    "BFS_NR;GEMEINDENAME;KANTON;anteil_dachflaechen_solar\n4021;Baden;AG;41.5\n4001;Aarau;AG;38.0\n261;Zürich;ZH;33.2\n"
}

async fn generate_document(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({ "status": "generated", "request": body }))
}

/// Start the mock on an ephemeral port and return its base URL.
pub async fn spawn() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let state = Arc::new(MockState {
        base_url: base_url.clone(),
        ..MockState::default()
    });

    let app = Router::new()
        .route("/res/v1/web/search", get(search))
        .route("/query", post(sparql))
        .route("/api/3/action/package_show", get(package_show))
        .route("/files/gemeinden.csv", get(csv_file))
        .route("/api/formation/generate-document", post(generate_document))
        .with_state(state);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    base_url
}
