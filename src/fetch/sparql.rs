//! LINDAS SPARQL client and query templates.
//!
//! Only integers and validated canton codes are ever interpolated into the
//! templates.

use super::ensure_success;
use crate::error::{ToolkitError, ToolkitResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

const SERVICE: &str = "SPARQL";

/// One solution row: variable name to lexical value.
pub type Binding = BTreeMap<String, String>;

#[derive(Debug, Deserialize)]
struct SparqlResponse {
    #[serde(default)]
    results: Option<SparqlResults>,
}

#[derive(Debug, Deserialize)]
struct SparqlResults {
    #[serde(default)]
    bindings: Vec<BTreeMap<String, BoundTerm>>,
}

#[derive(Debug, Deserialize)]
struct BoundTerm {
    #[serde(default)]
    value: String,
}

/// Parse an `application/sparql-results+json` body.
pub fn parse_bindings(body: &str) -> ToolkitResult<Vec<Binding>> {
    let parsed: SparqlResponse = serde_json::from_str(body)
        .map_err(|e| ToolkitError::upstream_parse(SERVICE, e.to_string()))?;

    Ok(parsed
        .results
        .map(|r| r.bindings)
        .unwrap_or_default()
        .into_iter()
        .map(|row| row.into_iter().map(|(k, term)| (k, term.value)).collect())
        .collect())
}

#[derive(Clone)]
pub struct SparqlClient {
    http: reqwest::Client,
    endpoint: String,
}

impl SparqlClient {
    pub fn new(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    /// Run a SELECT query.
    pub async fn select(&self, query: &str) -> ToolkitResult<Vec<Binding>> {
        debug!(endpoint = %self.endpoint, "SPARQL query");
        let response = self
            .http
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, "application/sparql-results+json")
            .form(&[("query", query)])
            .send()
            .await?;

        let body = ensure_success(SERVICE, response).await?.text().await?;
        parse_bindings(&body)
    }

    pub async fn elcom_tariffs(&self, bfs_number: i64, year: i64) -> ToolkitResult<Vec<ElcomTariff>> {
        let bindings = self.select(&elcom_tariff_query(bfs_number, year)).await?;
        Ok(bindings
            .iter()
            .map(|b| ElcomTariff::from_binding(b, bfs_number, year))
            .collect())
    }

    pub async fn municipalities(&self, kanton: Option<&str>) -> ToolkitResult<Vec<Municipality>> {
        let bindings = self.select(&municipalities_query(kanton)?).await?;
        Ok(bindings.iter().map(Municipality::from_binding).collect())
    }
}

/// ElCom tariff observations for one municipality and year.
pub fn elcom_tariff_query(bfs_number: i64, year: i64) -> String {
    format!(
        r#"PREFIX schema: <http://schema.org/>
PREFIX cube: <https://cube.link/>
PREFIX elcom: <https://energy.ld.admin.ch/elcom/electricityprice/dimension/>
SELECT ?operator ?category ?total ?energy ?grid ?municipality_fee ?kev
WHERE {{
  ?obs a cube:Observation ;
       elcom:municipality <https://ld.admin.ch/municipality/{bfs_number}> ;
       elcom:period "{year}"^^<http://www.w3.org/2001/XMLSchema#gYear> ;
       elcom:operator ?operatorUri ;
       elcom:category ?categoryUri ;
       elcom:total ?total .
  OPTIONAL {{ ?obs elcom:gridusage ?grid }}
  OPTIONAL {{ ?obs elcom:energy ?energy }}
  OPTIONAL {{ ?obs elcom:charge ?municipality_fee }}
  OPTIONAL {{ ?obs elcom:aidfee ?kev }}
  ?operatorUri schema:name ?operator .
  ?categoryUri schema:name ?category .
}} ORDER BY ?operator ?category"#
    )
}

/// Canton codes are two ASCII letters.
pub fn validate_kanton(kanton: &str) -> ToolkitResult<String> {
    let code = kanton.trim();
    if code.len() == 2 && code.bytes().all(|b| b.is_ascii_alphabetic()) {
        Ok(code.to_ascii_uppercase())
    } else {
        Err(ToolkitError::invalid_parameter(
            "kanton",
            format!("expected a two-letter canton code, got '{}'", kanton),
        ))
    }
}

/// All Swiss municipalities, optionally restricted to one canton.
pub fn municipalities_query(kanton: Option<&str>) -> ToolkitResult<String> {
    let filter = match kanton {
        Some(k) => format!(
            r#"FILTER(STRENDS(STR(?canton), "{}"))"#,
            validate_kanton(k)?
        ),
        None => String::new(),
    };

    Ok(format!(
        r#"PREFIX schema: <http://schema.org/>
PREFIX admin: <https://schema.ld.admin.ch/>
SELECT ?bfs ?name ?canton ?population WHERE {{
  ?municipality a admin:Municipality ;
    schema:identifier ?bfs ;
    schema:name ?name ;
    admin:canton ?canton .
  OPTIONAL {{ ?municipality schema:population ?population }}
  {filter}
}} ORDER BY ?name"#
    ))
}

fn number(binding: &Binding, key: &str) -> f64 {
    binding
        .get(key)
        .and_then(|v| v.trim().parse::<f64>().ok())
        .unwrap_or(0.0)
}

fn text(binding: &Binding, key: &str) -> String {
    binding.get(key).cloned().unwrap_or_default()
}

/// One ElCom tariff row in Rappen per kWh. Missing components are 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElcomTariff {
    pub bfs_number: i64,
    pub year: i64,
    pub operator_name: String,
    pub category: String,
    pub total_rp_kwh: f64,
    pub energy_rp_kwh: f64,
    pub grid_rp_kwh: f64,
    pub municipality_fee_rp_kwh: f64,
    pub kev_rp_kwh: f64,
}

impl ElcomTariff {
    pub fn from_binding(binding: &Binding, bfs_number: i64, year: i64) -> Self {
        Self {
            bfs_number,
            year,
            operator_name: text(binding, "operator"),
            category: text(binding, "category"),
            total_rp_kwh: number(binding, "total"),
            energy_rp_kwh: number(binding, "energy"),
            grid_rp_kwh: number(binding, "grid"),
            municipality_fee_rp_kwh: number(binding, "municipality_fee"),
            kev_rp_kwh: number(binding, "kev"),
        }
    }

    /// H4 is the reference household profile (4500 kWh/year).
    pub fn is_household_h4(&self) -> bool {
        self.category.starts_with("H4")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Municipality {
    pub bfs_number: i64,
    pub name: String,
    pub kanton: String,
    pub population: i64,
}

impl Municipality {
    pub fn from_binding(binding: &Binding) -> Self {
        let int = |key: &str| {
            binding
                .get(key)
                .and_then(|v| v.trim().parse::<i64>().ok())
                .unwrap_or(0)
        };
        Self {
            bfs_number: int("bfs"),
            name: text(binding, "name"),
            kanton: binding
                .get("canton")
                .and_then(|uri| uri.rsplit('/').next())
                .unwrap_or_default()
                .to_string(),
            population: int("population"),
        }
    }
}
