//! Tenant (white-label city) configuration and municipality seeding.

use super::context::ToolContext;
use super::macros::handler;
use super::{ParsedArgs, limit_arg, row_or, rows_value};
use crate::error::{ToolkitError, ToolkitResult};
use crate::sql::{SelectBuilder, SqlFragment};
use crate::tools::registry::ToolSpec;
use crate::tools::schema::ParamSpec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::sync::Arc;

const SITE_URL: &str = "https://openleg.ch";

/// The JSONB `config` column of a tenant.
///
/// Keys beyond the declared ones (`site_url`, `ga4_id`, map bounds) are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TenantConfig {
    /// Display name of the city
    pub city_name: String,
    /// Canton name
    pub kanton: String,
    /// Canton code (2 letters)
    pub kanton_code: String,
    /// Platform name, e.g. "SchaffhausenLEG"
    pub platform_name: String,
    pub brand_prefix: String,
    pub map_center_lat: f64,
    pub map_center_lon: f64,
    #[serde(default = "default_map_zoom")]
    pub map_zoom: f64,
    /// PLZ ranges `[[from, to], ...]`
    pub plz_ranges: Vec<[u32; 2]>,
    /// Regional solar yield in kWh/kWp
    #[serde(default = "default_solar_yield")]
    pub solar_kwh_per_kwp: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_map_zoom() -> f64 {
    14.0
}

fn default_solar_yield() -> f64 {
    950.0
}

fn tenant_config_schema() -> Value {
    schemars::schema_for!(TenantConfig).to_value()
}

pub fn tools() -> Vec<ToolSpec> {
    vec![
        ToolSpec::read(
            "list_tenants",
            "List tenant configs from white_label_configs",
            handler!(list_tenants),
        )
        .param(
            ParamSpec::boolean("active_only")
                .default(true)
                .describe("Only show active tenants"),
        ),
        ToolSpec::read(
            "get_tenant",
            "Get full tenant config by territory slug",
            handler!(get_tenant),
        )
        .param(ParamSpec::text("territory").describe("Territory slug (e.g. \"baden\")")),
        ToolSpec::write(
            "upsert_tenant",
            "Create or update a tenant/city config keyed by territory",
            handler!(upsert_tenant),
        )
        .param(
            ParamSpec::text("territory")
                .describe("Territory slug (lowercase, no spaces, e.g. \"schaffhausen\")"),
        )
        .param(ParamSpec::json("config", Some(tenant_config_schema)).describe("JSONB config object"))
        .param(ParamSpec::text("utility_name").describe("Local utility/VNB name"))
        .param(ParamSpec::text("primary_color").default("#c7021a").describe("Hex color"))
        .param(ParamSpec::text("secondary_color").default("#f59e0b").describe("Hex color"))
        .param(ParamSpec::text("contact_email").default(""))
        .param(ParamSpec::text("legal_entity").default(""))
        .param(ParamSpec::text("dso_contact").default(""))
        .param(ParamSpec::boolean("active").default(true)),
        ToolSpec::read(
            "get_tenant_stats",
            "Registration stats per tenant/city_id",
            handler!(get_tenant_stats),
        ),
        ToolSpec::read(
            "get_unseeded_municipalities",
            "Municipalities without tenant config, ranked by value gap and solar potential",
            handler!(get_unseeded_municipalities),
        )
        .param(
            ParamSpec::text("kanton")
                .optional()
                .describe("Filter by kanton code (e.g. ZH, BE, AG)"),
        )
        .param(ParamSpec::integer("limit").default(50)),
        ToolSpec::read(
            "get_outreach_candidates",
            "Seeded municipalities with no registrations and no contact email",
            handler!(get_outreach_candidates),
        )
        .param(ParamSpec::integer("limit").default(50)),
        ToolSpec::read(
            "get_all_swiss_municipalities",
            "All Swiss municipalities from LINDAS: BFS number, name, kanton, population",
            handler!(get_all_swiss_municipalities),
        )
        .param(ParamSpec::text("kanton").optional().describe("Kanton code, e.g. ZH")),
        ToolSpec::read(
            "draft_outreach",
            "Draft a German outreach email offering free LEG infrastructure to a municipality",
            handler!(draft_outreach),
        )
        .param(ParamSpec::text("municipality_name").describe("Name of the Gemeinde"))
        .param(ParamSpec::integer("bfs_number"))
        .param(
            ParamSpec::number("value_gap_chf")
                .describe("Annual savings potential per household in CHF"),
        )
        .param(
            ParamSpec::number("solar_potential_pct")
                .describe("Solar potential percentage of suitable roofs"),
        ),
    ]
}

async fn list_tenants(ctx: Arc<ToolContext>, args: ParsedArgs) -> ToolkitResult<Value> {
    let query = SelectBuilder::new(
        "SELECT id, territory, utility_name, primary_color, contact_email, active, config,
                created_at, updated_at
         FROM white_label_configs",
    )
    .condition_if(args.flag("active_only")?, "active = TRUE")
    .order_by("territory")
    .build();

    Ok(rows_value(ctx.db.rows(&query).await?))
}

async fn get_tenant(ctx: Arc<ToolContext>, args: ParsedArgs) -> ToolkitResult<Value> {
    let query = SqlFragment::new("SELECT * FROM white_label_configs WHERE territory = $1")
        .bind(args.text("territory")?);
    row_or(ctx.db.first(&query).await?, "Tenant not found")
}

async fn upsert_tenant(ctx: Arc<ToolContext>, args: ParsedArgs) -> ToolkitResult<Value> {
    ctx.gate.check()?;

    let territory = args.text("territory")?;
    if territory.is_empty() || territory.chars().any(|c| c.is_whitespace() || c.is_uppercase()) {
        return Err(ToolkitError::invalid_parameter(
            "territory",
            "expected a lowercase slug without spaces",
        ));
    }
    let config: TenantConfig = args.decode("config")?;
    let config = serde_json::to_value(&config)
        .map_err(|e| ToolkitError::internal(format!("tenant config: {}", e)))?;

    let upsert = SqlFragment::new(
        "INSERT INTO white_label_configs (territory, utility_name, primary_color, secondary_color,
                                          contact_email, legal_entity, dso_contact, active, config,
                                          created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW(), NOW())
         ON CONFLICT (territory) DO UPDATE SET
           utility_name = EXCLUDED.utility_name,
           primary_color = EXCLUDED.primary_color,
           secondary_color = EXCLUDED.secondary_color,
           contact_email = EXCLUDED.contact_email,
           legal_entity = EXCLUDED.legal_entity,
           dso_contact = EXCLUDED.dso_contact,
           active = EXCLUDED.active,
           config = EXCLUDED.config,
           updated_at = NOW()
         RETURNING *",
    )
    .bind(territory)
    .bind(args.text("utility_name")?)
    .bind(args.text("primary_color")?)
    .bind(args.text("secondary_color")?)
    .bind(args.text("contact_email")?)
    .bind(args.text("legal_entity")?)
    .bind(args.text("dso_contact")?)
    .bind(args.flag("active")?)
    .bind(config);

    ctx.db
        .first(&upsert)
        .await?
        .map(Value::Object)
        .ok_or_else(|| ToolkitError::internal("tenant upsert returned no row"))
}

async fn get_tenant_stats(ctx: Arc<ToolContext>, _args: ParsedArgs) -> ToolkitResult<Value> {
    let query = SqlFragment::new(
        "SELECT city_id, COUNT(*) AS total, COUNT(*) FILTER (WHERE verified = true) AS verified
         FROM buildings
         GROUP BY city_id
         ORDER BY total DESC",
    );
    Ok(rows_value(ctx.db.rows(&query).await?))
}

async fn get_unseeded_municipalities(ctx: Arc<ToolContext>, args: ParsedArgs) -> ToolkitResult<Value> {
    let query = SelectBuilder::filtered(
        "SELECT mp.bfs_number, mp.name, mp.kanton, mp.solar_potential_pct, mp.leg_value_gap_chf
         FROM municipality_profiles mp
         LEFT JOIN white_label_configs wlc ON LOWER(mp.name) = wlc.territory
         WHERE wlc.territory IS NULL",
    )
    .eq("mp.kanton", args.opt_text("kanton").map(|k| k.to_uppercase()))
    .order_by("mp.leg_value_gap_chf DESC NULLS LAST, mp.solar_potential_pct DESC NULLS LAST")
    .limit(limit_arg(&args)?)
    .build();

    let rows = ctx.db.rows(&query).await?;
    Ok(json!({ "count": rows.len(), "municipalities": rows_value(rows) }))
}

async fn get_outreach_candidates(ctx: Arc<ToolContext>, args: ParsedArgs) -> ToolkitResult<Value> {
    let query = SqlFragment::new(
        "SELECT wlc.territory, wlc.config->>'city_name' AS city_name,
                wlc.config->>'kanton' AS kanton
         FROM white_label_configs wlc
         LEFT JOIN buildings b ON b.city_id = wlc.territory
         WHERE wlc.active = true
         GROUP BY wlc.id, wlc.territory, wlc.config
         HAVING COUNT(b.building_id) = 0
            AND (wlc.contact_email IS NULL OR wlc.contact_email = '')
         ORDER BY wlc.created_at ASC
         LIMIT $1",
    )
    .bind(limit_arg(&args)?);

    let rows = ctx.db.rows(&query).await?;
    Ok(json!({ "count": rows.len(), "candidates": rows_value(rows) }))
}

async fn get_all_swiss_municipalities(ctx: Arc<ToolContext>, args: ParsedArgs) -> ToolkitResult<Value> {
    let kanton = args.opt_text("kanton");
    let municipalities = ctx.sparql.municipalities(kanton.as_deref()).await?;
    Ok(json!({ "count": municipalities.len(), "municipalities": municipalities }))
}

/// German outreach email for a municipality.
pub fn outreach_email(
    municipality_name: &str,
    bfs_number: i64,
    value_gap_chf: f64,
    solar_potential_pct: f64,
) -> String {
    let profile_url = format!("{}/gemeinde/{}/profil", SITE_URL, bfs_number);
    let onboarding_url = format!("{}/gemeinde/{}/onboarding", SITE_URL, bfs_number);
    format!(
        "Betreff: Kostenlose LEG-Infrastruktur für {name}\n\n\
         Sehr geehrte Gemeindeverantwortliche\n\n\
         Die Gemeinde {name} verfügt über ein hohes Potenzial für Lokale Elektrizitätsgemeinschaften (LEG).\n\n\
         Kennzahlen:\n\
         - Solarpotenzial: {solar}% der Dachflächen geeignet\n\
         - Einsparpotenzial: ca. CHF {gap} pro Haushalt und Jahr\n\n\
         OpenLEG stellt kostenlose, quelloffene Infrastruktur für die Gründung und Verwaltung von LEGs bereit. \
         Kein Datenverkauf, keine Gebühren.\n\n\
         Gemeindeprofil: {profile}\n\
         Onboarding starten: {onboarding}\n\n\
         Freundliche Grüsse\n\
         OpenLEG\n\
         hallo@openleg.ch",
        name = municipality_name,
        solar = solar_potential_pct,
        gap = value_gap_chf,
        profile = profile_url,
        onboarding = onboarding_url,
    )
}

async fn draft_outreach(_ctx: Arc<ToolContext>, args: ParsedArgs) -> ToolkitResult<Value> {
    let municipality_name = args.text("municipality_name")?;
    let bfs_number = args.integer("bfs_number")?;
    let value_gap_chf = args.number("value_gap_chf")?;
    let solar_potential_pct = args.number("solar_potential_pct")?;

    Ok(json!({
        "email": outreach_email(&municipality_name, bfs_number, value_gap_chf, solar_potential_pct),
        "metadata": {
            "municipality_name": municipality_name,
            "bfs_number": bfs_number,
            "value_gap_chf": value_gap_chf,
            "solar_potential_pct": solar_potential_pct,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_and_extra_keys() {
        let config: TenantConfig = serde_json::from_value(json!({
            "city_name": "Schaffhausen",
            "kanton": "Schaffhausen",
            "kanton_code": "SH",
            "platform_name": "SchaffhausenLEG",
            "brand_prefix": "Schaffhausen",
            "map_center_lat": 47.696,
            "map_center_lon": 8.634,
            "plz_ranges": [[8200, 8299]],
            "ga4_id": "G-XYZ"
        }))
        .unwrap();
        assert_eq!(config.map_zoom, 14.0);
        assert_eq!(config.solar_kwh_per_kwp, 950.0);

        let stored = serde_json::to_value(&config).unwrap();
        assert_eq!(stored["ga4_id"], "G-XYZ");
        assert_eq!(stored["map_zoom"], 14.0);
    }

    #[test]
    fn test_config_round_trips_plz_and_fractional_zoom() {
        let input = json!({
            "city_name": "Baden",
            "kanton": "Aargau",
            "kanton_code": "AG",
            "platform_name": "BadenLEG",
            "brand_prefix": "Baden",
            "map_center_lat": 47.4734,
            "map_center_lon": 8.3063,
            "map_zoom": 13.5,
            "plz_ranges": [[5400, 5499], [8200, 8299]]
        });
        let config: TenantConfig = serde_json::from_value(input).unwrap();
        assert_eq!(config.plz_ranges, vec![[5400, 5499], [8200, 8299]]);

        let stored = serde_json::to_value(&config).unwrap();
        assert_eq!(stored["plz_ranges"], json!([[5400, 5499], [8200, 8299]]));
        assert_eq!(stored["plz_ranges"].to_string(), "[[5400,5499],[8200,8299]]");
        assert_eq!(stored["map_zoom"], 13.5);
    }

    #[test]
    fn test_config_rejects_malformed_plz_range() {
        let result = serde_json::from_value::<TenantConfig>(json!({
            "city_name": "Baden",
            "kanton": "Aargau",
            "kanton_code": "AG",
            "platform_name": "BadenLEG",
            "brand_prefix": "Baden",
            "map_center_lat": 47.4734,
            "map_center_lon": 8.3063,
            "plz_ranges": [[5400]]
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_config_requires_city_name() {
        let result = serde_json::from_value::<TenantConfig>(json!({ "kanton": "AG" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_config_schema_lists_fields() {
        let schema = tenant_config_schema();
        let properties = schema["properties"].as_object().unwrap();
        assert!(properties.contains_key("plz_ranges"));
        assert!(properties.contains_key("solar_kwh_per_kwp"));
    }

    #[test]
    fn test_outreach_email() {
        let email = outreach_email("Baden", 4021, 177.66, 62.5);
        assert!(email.starts_with("Betreff: Kostenlose LEG-Infrastruktur für Baden\n\n"));
        assert!(email.contains("- Solarpotenzial: 62.5% der Dachflächen geeignet"));
        assert!(email.contains("ca. CHF 177.66 pro Haushalt und Jahr"));
        assert!(email.contains("Gemeindeprofil: https://openleg.ch/gemeinde/4021/profil"));
        assert!(email.contains("Onboarding starten: https://openleg.ch/gemeinde/4021/onboarding"));
        assert!(email.ends_with("hallo@openleg.ch"));
    }

    #[test]
    fn test_whole_savings_print_without_decimals() {
        let email = outreach_email("Wettingen", 4045, 180.0, 40.0);
        assert!(email.contains("ca. CHF 180 pro Haushalt"));
        assert!(email.contains("Solarpotenzial: 40%"));
    }
}
