//! Public-data fetchers: ElCom tariffs, Energie Reporter, Sonnendach.
//!
//! Each fetcher caches what it downloads with an upsert keyed by the
//! natural key of the source, so repeated runs refresh rather than duplicate.

use super::context::ToolContext;
use super::macros::handler;
use super::ParsedArgs;
use crate::db::types::as_f64;
use crate::db::Row;
use crate::error::ToolkitResult;
use crate::fetch::opendata::{
    BFS_COLUMNS, CsvRow, KANTON_COLUMNS, NAME_COLUMNS, field, int_field, number_field,
};
use crate::fetch::sparql::ElcomTariff;
use crate::scoring::{TransitionIndicators, annual_savings_chf, energy_transition_score};
use crate::sql::SqlFragment;
use crate::tools::registry::ToolSpec;
use crate::tools::schema::ParamSpec;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::{info, warn};

pub const DEFAULT_TARIFF_YEAR: i64 = 2026;
const ENERGIE_REPORTER_PACKAGE: &str = "energie-reporter";
const SONNENDACH_PACKAGE: &str = "sonnendach-ch";
const SONNENDACH_HINTS: &[&str] = &["gemeinde", "municipal"];

pub fn tools() -> Vec<ToolSpec> {
    vec![
        ToolSpec::read(
            "fetch_elcom_tariffs",
            "Fetch ElCom electricity tariffs for a municipality from LINDAS and cache them",
            handler!(fetch_elcom_tariffs),
        )
        .param(
            ParamSpec::integer("bfs_number")
                .describe("BFS municipality number (e.g. 261 for Dietikon)"),
        )
        .param(
            ParamSpec::integer("year")
                .default(DEFAULT_TARIFF_YEAR)
                .describe("Tariff year"),
        ),
        ToolSpec::read(
            "fetch_energie_reporter",
            "Download Energie Reporter data from opendata.swiss into municipality profiles",
            handler!(fetch_energie_reporter),
        )
        .param(
            ParamSpec::text("kanton")
                .default("ZH")
                .describe("Canton code to filter"),
        ),
        ToolSpec::read(
            "fetch_sonnendach_data",
            "Fetch municipal solar potential from BFE Sonnendach (opendata.swiss) and cache it",
            handler!(fetch_sonnendach_data),
        )
        .param(
            ParamSpec::integer("bfs_number")
                .optional()
                .describe("Specific BFS number, or omit for all"),
        ),
        ToolSpec::read(
            "refresh_municipality_data",
            "End-to-end refresh for a municipality: tariffs, value gap, transition score",
            handler!(refresh_municipality_data),
        )
        .param(ParamSpec::integer("bfs_number").describe("BFS municipality number")),
    ]
}

fn tariff_upsert(tariff: &ElcomTariff) -> SqlFragment {
    SqlFragment::new(
        "INSERT INTO elcom_tariffs (bfs_number, operator_name, year, category, total_rp_kwh,
                                    energy_rp_kwh, grid_rp_kwh, municipality_fee_rp_kwh, kev_rp_kwh)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         ON CONFLICT (bfs_number, operator_name, year, category) DO UPDATE SET
           total_rp_kwh = EXCLUDED.total_rp_kwh, energy_rp_kwh = EXCLUDED.energy_rp_kwh,
           grid_rp_kwh = EXCLUDED.grid_rp_kwh,
           municipality_fee_rp_kwh = EXCLUDED.municipality_fee_rp_kwh,
           kev_rp_kwh = EXCLUDED.kev_rp_kwh, fetched_at = NOW()
         RETURNING bfs_number",
    )
    .bind(tariff.bfs_number)
    .bind(tariff.operator_name.as_str())
    .bind(tariff.year)
    .bind(tariff.category.as_str())
    .bind(tariff.total_rp_kwh)
    .bind(tariff.energy_rp_kwh)
    .bind(tariff.grid_rp_kwh)
    .bind(tariff.municipality_fee_rp_kwh)
    .bind(tariff.kev_rp_kwh)
}

/// Fetch tariffs from LINDAS and upsert each one.
async fn cache_tariffs(ctx: &ToolContext, bfs_number: i64, year: i64) -> ToolkitResult<Vec<ElcomTariff>> {
    let tariffs = ctx.sparql.elcom_tariffs(bfs_number, year).await?;
    for tariff in &tariffs {
        ctx.db.query(&tariff_upsert(tariff)).await?;
    }
    info!(bfs_number, year, tariffs = tariffs.len(), "ElCom tariffs cached");
    Ok(tariffs)
}

async fn fetch_elcom_tariffs(ctx: Arc<ToolContext>, args: ParsedArgs) -> ToolkitResult<Value> {
    let bfs_number = args.integer("bfs_number")?;
    let year = args.integer("year")?;
    let tariffs = cache_tariffs(&ctx, bfs_number, year).await?;

    Ok(json!({
        "bfs_number": bfs_number,
        "year": year,
        "tariffs_count": tariffs.len(),
        "tariffs": tariffs,
    }))
}

/// Whether an Energie Reporter row belongs to `kanton` (case-insensitive).
fn in_kanton(row: &CsvRow, kanton: &str) -> bool {
    kanton.is_empty()
        || field(row, KANTON_COLUMNS).is_some_and(|k| k.eq_ignore_ascii_case(kanton))
}

fn profile_upsert(row: &CsvRow, bfs_number: i64, fetched_at: &str) -> SqlFragment {
    SqlFragment::new(
        "INSERT INTO municipality_profiles (bfs_number, name, kanton, solar_potential_pct,
                                           ev_share_pct, renewable_heating_pct,
                                           electricity_consumption_mwh, renewable_production_mwh,
                                           data_sources)
         VALUES ($1, $2, $3, $4::numeric, $5::numeric, $6::numeric, $7::numeric, $8::numeric, $9)
         ON CONFLICT (bfs_number) DO UPDATE SET
           name = EXCLUDED.name, solar_potential_pct = EXCLUDED.solar_potential_pct,
           ev_share_pct = EXCLUDED.ev_share_pct,
           renewable_heating_pct = EXCLUDED.renewable_heating_pct,
           electricity_consumption_mwh = EXCLUDED.electricity_consumption_mwh,
           renewable_production_mwh = EXCLUDED.renewable_production_mwh,
           data_sources = municipality_profiles.data_sources || EXCLUDED.data_sources,
           updated_at = NOW()
         RETURNING bfs_number",
    )
    .bind(bfs_number)
    .bind(field(row, NAME_COLUMNS).unwrap_or_default())
    .bind(field(row, KANTON_COLUMNS).unwrap_or_default())
    .bind(number_field(row, "anteil_dachflaechen_solar"))
    .bind(number_field(row, "anteil_ev"))
    .bind(number_field(row, "anteil_erneuerbar_heizen"))
    .bind(number_field(row, "stromverbrauch_mwh"))
    .bind(number_field(row, "erneuerbare_produktion_mwh"))
    .bind(json!({ "energie_reporter": true, "fetched_at": fetched_at }))
}

async fn fetch_energie_reporter(ctx: Arc<ToolContext>, args: ParsedArgs) -> ToolkitResult<Value> {
    let kanton = args.text("kanton")?;
    let rows = ctx.opendata.package_csv(ENERGIE_REPORTER_PACKAGE, &[]).await?;
    let fetched_at = chrono::Utc::now().to_rfc3339();

    let mut upserted = 0;
    for row in &rows {
        let Some(bfs_number) = int_field(row, BFS_COLUMNS) else {
            continue;
        };
        if !in_kanton(row, &kanton) {
            continue;
        }
        ctx.db.query(&profile_upsert(row, bfs_number, &fetched_at)).await?;
        upserted += 1;
    }

    info!(kanton = %kanton, rows = rows.len(), upserted, "Energie Reporter imported");
    Ok(json!({ "kanton": kanton, "municipalities_upserted": upserted }))
}

fn sonnendach_upsert(row: &CsvRow, bfs_number: i64) -> SqlFragment {
    SqlFragment::new(
        "INSERT INTO sonnendach_municipal (bfs_number, total_roof_area_m2, suitable_roof_area_m2,
                                          potential_kwh_year, potential_kwp, utilization_pct)
         VALUES ($1, $2::numeric, $3::numeric, $4::numeric, $5::numeric, $6::numeric)
         ON CONFLICT (bfs_number) DO UPDATE SET
           total_roof_area_m2 = EXCLUDED.total_roof_area_m2,
           suitable_roof_area_m2 = EXCLUDED.suitable_roof_area_m2,
           potential_kwh_year = EXCLUDED.potential_kwh_year,
           potential_kwp = EXCLUDED.potential_kwp,
           utilization_pct = EXCLUDED.utilization_pct, fetched_at = NOW()
         RETURNING bfs_number",
    )
    .bind(bfs_number)
    .bind(number_field(row, "dachflaeche_total_m2"))
    .bind(number_field(row, "dachflaeche_geeignet_m2"))
    .bind(number_field(row, "potenzial_kwh_jahr"))
    .bind(number_field(row, "potenzial_kwp"))
    .bind(number_field(row, "auslastung_pct"))
}

async fn fetch_sonnendach_data(ctx: Arc<ToolContext>, args: ParsedArgs) -> ToolkitResult<Value> {
    let only = args.opt_integer("bfs_number");
    let rows = ctx
        .opendata
        .package_csv(SONNENDACH_PACKAGE, SONNENDACH_HINTS)
        .await?;

    let mut upserted = 0;
    for row in &rows {
        let Some(bfs_number) = int_field(row, BFS_COLUMNS) else {
            continue;
        };
        if only.is_some_and(|wanted| wanted != bfs_number) {
            continue;
        }
        ctx.db.query(&sonnendach_upsert(row, bfs_number)).await?;
        upserted += 1;
    }

    Ok(json!({
        "municipalities_upserted": upserted,
        "bfs_number": only.map(Value::from).unwrap_or_else(|| json!("all")),
    }))
}

/// Transition indicators from a `municipality_profiles` row; missing values are 0.
pub fn indicators_from_profile(profile: &Row) -> TransitionIndicators {
    let value = |key: &str| profile.get(key).and_then(as_f64).unwrap_or(0.0);
    TransitionIndicators {
        solar_potential_pct: value("solar_potential_pct"),
        ev_share_pct: value("ev_share_pct"),
        renewable_heating_pct: value("renewable_heating_pct"),
        electricity_consumption_mwh: value("electricity_consumption_mwh"),
        renewable_production_mwh: value("renewable_production_mwh"),
    }
}

async fn refresh_steps(
    ctx: &ToolContext,
    bfs_number: i64,
    steps: &mut Map<String, Value>,
) -> ToolkitResult<()> {
    let tariffs = cache_tariffs(ctx, bfs_number, DEFAULT_TARIFF_YEAR).await?;
    steps.insert("elcom".into(), json!({ "tariffs": tariffs.len() }));

    let Some(h4) = tariffs.iter().find(|t| t.is_household_h4()) else {
        return Ok(());
    };
    let savings = annual_savings_chf(h4.grid_rp_kwh);
    steps.insert(
        "value_gap".into(),
        json!({ "grid_fee_rp": h4.grid_rp_kwh, "annual_savings_chf": savings }),
    );

    let profile = ctx
        .db
        .first(
            &SqlFragment::new("SELECT * FROM municipality_profiles WHERE bfs_number = $1")
                .bind(bfs_number),
        )
        .await?
        .unwrap_or_default();
    let score = energy_transition_score(&indicators_from_profile(&profile));

    ctx.db
        .query(
            &SqlFragment::new(
                "UPDATE municipality_profiles SET leg_value_gap_chf = $2::numeric,
                        energy_transition_score = $3::numeric,
                        data_sources = data_sources || $4, updated_at = NOW()
                 WHERE bfs_number = $1 RETURNING bfs_number",
            )
            .bind(bfs_number)
            .bind(savings)
            .bind(score)
            .bind(json!({
                "elcom": true,
                "last_refresh": chrono::Utc::now().to_rfc3339(),
            })),
        )
        .await?;
    steps.insert(
        "profile".into(),
        json!({ "score": score, "value_gap_chf": savings }),
    );
    Ok(())
}

async fn refresh_municipality_data(ctx: Arc<ToolContext>, args: ParsedArgs) -> ToolkitResult<Value> {
    let bfs_number = args.integer("bfs_number")?;

    let mut steps = Map::new();
    if let Err(e) = refresh_steps(&ctx, bfs_number, &mut steps).await {
        warn!(bfs_number, error = %e, "Municipality refresh stopped early");
        steps.insert("error".into(), Value::String(e.to_string()));
    }

    Ok(json!({ "bfs_number": bfs_number, "steps": steps }))
}
