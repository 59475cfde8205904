//! Shared fixtures: a recording fake database and dispatcher builders.

#![allow(dead_code)]

use async_trait::async_trait;
use leg_toolkit::db::{Database, QueryOutcome, Row, SqlValue};
use leg_toolkit::error::ToolkitResult;
use leg_toolkit::sql::SqlFragment;
use leg_toolkit::tools::{Dispatcher, Endpoints, MutationGate, ToolContext, ToolRegistry};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// One statement as the database received it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// In-memory stand-in for PostgreSQL.
///
/// Records every statement. `white_label_configs` is kept as a table keyed
/// by territory and `insights_cache` keeps its latest `data`; every other
/// statement answers with one `{"id": 1}` row unless `empty` is set.
#[derive(Default)]
pub struct RecordingDatabase {
    calls: Mutex<Vec<Recorded>>,
    tenants: Mutex<BTreeMap<String, Row>>,
    insight: Mutex<Option<Value>>,
    empty: bool,
}

impl RecordingDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// A database where every non-tenant query returns no rows.
    pub fn empty() -> Self {
        Self {
            empty: true,
            ..Self::default()
        }
    }

    /// A database whose `insights_cache` already holds `data`.
    pub fn with_snapshot(data: Value) -> Self {
        Self {
            insight: Mutex::new(Some(data)),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn tenant_count(&self) -> usize {
        self.tenants.lock().unwrap().len()
    }

    fn answer(&self, fragment: &SqlFragment) -> QueryOutcome {
        self.calls.lock().unwrap().push(Recorded {
            sql: fragment.sql().to_string(),
            params: fragment.params().to_vec(),
        });

        let sql = fragment.sql();
        if sql.contains("INSERT INTO white_label_configs") {
            return QueryOutcome::new(vec![self.store_tenant(fragment.params())]);
        }
        if sql.contains("FROM white_label_configs") {
            let tenants = self.tenants.lock().unwrap();
            let rows = match fragment.params().first() {
                Some(SqlValue::Text(territory)) => {
                    tenants.get(territory).cloned().into_iter().collect()
                }
                _ => tenants.values().cloned().collect(),
            };
            return QueryOutcome::new(rows);
        }

        if sql.contains("INSERT INTO insights_cache") {
            let data = fragment.params().first().map(to_json).unwrap_or(Value::Null);
            *self.insight.lock().unwrap() = Some(data);
            return QueryOutcome::new(vec![single("insight_type", json!("leghub_partners"))]);
        }
        if sql.contains("FROM insights_cache") {
            let snapshot = self.insight.lock().unwrap().clone();
            let rows = snapshot.map(|data| single("data", data)).into_iter().collect();
            return QueryOutcome::new(rows);
        }

        if self.empty {
            QueryOutcome::default()
        } else {
            QueryOutcome::new(vec![single("id", json!(1))])
        }
    }

    fn store_tenant(&self, params: &[SqlValue]) -> Row {
        let columns = [
            "territory",
            "utility_name",
            "primary_color",
            "secondary_color",
            "contact_email",
            "legal_entity",
            "dso_contact",
            "active",
            "config",
        ];
        let row: Row = columns
            .iter()
            .zip(params)
            .map(|(column, value)| (column.to_string(), to_json(value)))
            .collect();
        let territory = row["territory"].as_str().unwrap_or_default().to_string();
        self.tenants.lock().unwrap().insert(territory, row.clone());
        row
    }
}

fn single(column: &str, value: Value) -> Row {
    let mut row = Row::new();
    row.insert(column.to_string(), value);
    row
}

fn to_json(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Bool(b) => json!(b),
        SqlValue::Int(i) => json!(i),
        SqlValue::Float(f) => json!(f),
        SqlValue::Text(s) => json!(s),
        SqlValue::Json(v) => v.clone(),
    }
}

#[async_trait]
impl Database for RecordingDatabase {
    async fn fetch(&self, fragment: &SqlFragment) -> ToolkitResult<QueryOutcome> {
        Ok(self.answer(fragment))
    }

    async fn fetch_atomic(&self, fragments: &[SqlFragment]) -> ToolkitResult<Vec<QueryOutcome>> {
        Ok(fragments.iter().map(|f| self.answer(f)).collect())
    }
}

/// Dispatcher over `db` with every upstream service at `base_url`.
pub fn dispatcher_at(
    db: Arc<RecordingDatabase>,
    readonly: bool,
    base_url: &str,
    brave_api_key: Option<&str>,
) -> Dispatcher {
    let mut endpoints = Endpoints::all_at(base_url);
    endpoints.brave_api_key = brave_api_key.map(str::to_string);
    let ctx = ToolContext::new(
        db,
        MutationGate::new(readonly),
        &endpoints,
        reqwest::Client::new(),
    );
    Dispatcher::new(Arc::new(ToolRegistry::standard().unwrap()), Arc::new(ctx))
}

/// Dispatcher whose upstream services are unreachable.
pub fn dispatcher(db: Arc<RecordingDatabase>, readonly: bool) -> Dispatcher {
    dispatcher_at(db, readonly, "http://127.0.0.1:9", None)
}

/// A valid `config` argument for `upsert_tenant`.
pub fn tenant_config() -> Value {
    json!({
        "city_name": "Baden",
        "kanton": "Aargau",
        "kanton_code": "AG",
        "platform_name": "BadenLEG",
        "brand_prefix": "Baden",
        "map_center_lat": 47.4734,
        "map_center_lon": 8.3063,
        "plz_ranges": [[5400, 5499]]
    })
}
