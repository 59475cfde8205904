//! Web research on utilities (VNBs) and the LEGHub partner list.

use super::context::ToolContext;
use super::macros::handler;
use super::ParsedArgs;
use crate::db::Row;
use crate::error::ToolkitResult;
use crate::fetch::SearchHit;
use crate::fetch::search::DEFAULT_RESULT_COUNT;
use crate::sql::SqlFragment;
use crate::tools::registry::ToolSpec;
use crate::tools::schema::ParamSpec;
use serde_json::{Map, Value, json};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

const PARTNER_QUERY: &str = "site:leghub.ch partner";
const PARTNER_COUNT: i64 = 10;

pub fn tools() -> Vec<ToolSpec> {
    vec![
        ToolSpec::read(
            "search_web",
            "Search the web via Brave Search API: regulations, energy law, DSO info",
            handler!(search_web),
        )
        .param(ParamSpec::text("query").describe("Search query"))
        .param(
            ParamSpec::integer("count")
                .default(DEFAULT_RESULT_COUNT)
                .describe("Number of results (1-10)"),
        ),
        ToolSpec::read(
            "research_vnb",
            "Research a Swiss VNB/utility: LEG offerings, LEGHub presence, PLZ coverage",
            handler!(research_vnb),
        )
        .param(ParamSpec::text("utility_name").describe("Name of the utility/VNB to research"))
        .param(
            ParamSpec::text("municipality")
                .optional()
                .describe("Municipality name for context"),
        ),
        ToolSpec::read(
            "scan_vnb_leg_offerings",
            "Search the web for a VNB's LEG product pages, pricing and platform partnerships",
            handler!(scan_vnb_leg_offerings),
        )
        .param(ParamSpec::text("utility_name").describe("Name of the VNB/utility")),
        ToolSpec::read(
            "monitor_leghub_partners",
            "Scan the leghub.ch partner list and report partners new since the last scan",
            handler!(monitor_leghub_partners),
        ),
    ]
}

pub fn research_queries(utility_name: &str, municipality: Option<&str>) -> Vec<String> {
    let mut queries = vec![
        format!("\"{}\" LEG Lokale Elektrizitätsgemeinschaft", utility_name),
        format!("\"{}\" leghub.ch", utility_name),
    ];
    if let Some(municipality) = municipality {
        queries.push(format!(
            "\"{}\" {} PLZ Versorgungsgebiet",
            utility_name, municipality
        ));
    }
    queries
}

pub fn offering_queries(utility_name: &str) -> Vec<String> {
    vec![
        format!(
            "\"{}\" LEG Lokale Elektrizitätsgemeinschaft Angebot",
            utility_name
        ),
        format!("\"{}\" GemeinsamStrom OR LEGhub", utility_name),
        format!("\"{}\" Netzgebühren LEG Reduktion", utility_name),
    ]
}

/// Partners in `current` whose URL was not in `previous`.
pub fn new_partners(current: &[SearchHit], previous: &[SearchHit]) -> Vec<SearchHit> {
    let known: HashSet<&str> = previous.iter().map(|p| p.url.as_str()).collect();
    current
        .iter()
        .filter(|p| !known.contains(p.url.as_str()))
        .cloned()
        .collect()
}

/// Partners stored in an `insights_cache` row.
///
/// Entries that do not decode are skipped with a warning so one bad entry
/// does not make every partner look new.
pub fn snapshot_partners(row: &Row) -> Vec<SearchHit> {
    let Some(entries) = row
        .get("data")
        .and_then(|d| d.get("partners"))
        .and_then(Value::as_array)
    else {
        warn!("Partner snapshot has no partners list");
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match serde_json::from_value::<SearchHit>(entry.clone()) {
            Ok(hit) if !hit.url.is_empty() => Some(hit),
            Ok(_) => {
                warn!(entry = %entry, "Skipping snapshot partner without URL");
                None
            }
            Err(e) => {
                warn!(entry = %entry, error = %e, "Skipping malformed snapshot partner");
                None
            }
        })
        .collect()
}

/// Run several searches; a failing query records `{"error": ...}` under its
/// own key instead of failing the whole batch.
async fn search_each(ctx: &ToolContext, queries: Vec<String>) -> ToolkitResult<Value> {
    ctx.search.ensure_configured()?;

    let mut results = Map::new();
    for query in queries {
        let entry = match ctx.search.search(&query, DEFAULT_RESULT_COUNT).await {
            Ok(hits) => json!(hits),
            Err(e) => {
                warn!(query = %query, error = %e, "Search query failed");
                json!({ "error": e.to_string() })
            }
        };
        results.insert(query, entry);
    }
    Ok(Value::Object(results))
}

async fn search_web(ctx: Arc<ToolContext>, args: ParsedArgs) -> ToolkitResult<Value> {
    let hits = ctx
        .search
        .search(&args.text("query")?, args.integer("count")?)
        .await?;
    Ok(json!(hits))
}

async fn research_vnb(ctx: Arc<ToolContext>, args: ParsedArgs) -> ToolkitResult<Value> {
    let queries = research_queries(
        &args.text("utility_name")?,
        args.opt_text("municipality").as_deref(),
    );
    search_each(&ctx, queries).await
}

async fn scan_vnb_leg_offerings(ctx: Arc<ToolContext>, args: ParsedArgs) -> ToolkitResult<Value> {
    let utility_name = args.text("utility_name")?;
    let searches = search_each(&ctx, offering_queries(&utility_name)).await?;
    Ok(json!({ "utility_name": utility_name, "searches": searches }))
}

async fn monitor_leghub_partners(ctx: Arc<ToolContext>, _args: ParsedArgs) -> ToolkitResult<Value> {
    ctx.search.ensure_configured()?;
    let partners = ctx.search.search(PARTNER_QUERY, PARTNER_COUNT).await?;

    let snapshot = ctx
        .db
        .first(&SqlFragment::new(
            "SELECT data FROM insights_cache WHERE insight_type = 'leghub_partners'
             ORDER BY computed_at DESC LIMIT 1",
        ))
        .await?;
    let previous = snapshot.map(|row| snapshot_partners(&row)).unwrap_or_default();

    let added = new_partners(&partners, &previous);

    let data = json!({
        "partners": partners,
        "scanned_at": chrono::Utc::now().to_rfc3339(),
    });
    ctx.db
        .query(
            &SqlFragment::new(
                "INSERT INTO insights_cache (insight_type, scope, period, data, expires_at)
                 VALUES ('leghub_partners', 'CH', 'current', $1, NOW() + INTERVAL '30 days')
                 ON CONFLICT (insight_type, scope, period) DO UPDATE SET
                   data = EXCLUDED.data, computed_at = NOW(), expires_at = EXCLUDED.expires_at
                 RETURNING insight_type",
            )
            .bind(data),
        )
        .await?;

    Ok(json!({
        "total_partners": partners.len(),
        "new_since_last_scan": added.len(),
        "new_partners": added,
        "all_partners": partners,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(url: &str) -> SearchHit {
        SearchHit {
            title: url.to_string(),
            url: url.to_string(),
            description: String::new(),
        }
    }

    #[test]
    fn test_new_partners_by_url() {
        let previous = vec![hit("https://leghub.ch/a"), hit("https://leghub.ch/b")];
        let current = vec![hit("https://leghub.ch/b"), hit("https://leghub.ch/c")];
        let added = new_partners(&current, &previous);
        assert_eq!(added, vec![hit("https://leghub.ch/c")]);
    }

    #[test]
    fn test_first_scan_reports_everything() {
        let current = vec![hit("https://leghub.ch/a")];
        assert_eq!(new_partners(&current, &[]), current);
    }

    fn snapshot(data: Value) -> Row {
        let mut row = Row::new();
        row.insert("data".into(), data);
        row
    }

    #[test]
    fn test_snapshot_skips_bad_entries() {
        let row = snapshot(json!({ "partners": [
            { "title": "A", "url": "https://leghub.ch/a", "description": null },
            { "title": 7, "url": "https://leghub.ch/x" },
            { "title": "no url" },
            { "url": "https://leghub.ch/b" }
        ]}));
        let urls: Vec<String> = snapshot_partners(&row).into_iter().map(|p| p.url).collect();
        assert_eq!(urls, vec!["https://leghub.ch/a", "https://leghub.ch/b"]);
    }

    #[test]
    fn test_snapshot_without_list() {
        assert!(snapshot_partners(&snapshot(json!({ "partners": "oops" }))).is_empty());
        assert!(snapshot_partners(&Row::new()).is_empty());
    }

    #[test]
    fn test_research_queries() {
        let queries = research_queries("EWZ", None);
        assert_eq!(
            queries,
            vec![
                "\"EWZ\" LEG Lokale Elektrizitätsgemeinschaft".to_string(),
                "\"EWZ\" leghub.ch".to_string(),
            ]
        );
        let queries = research_queries("EWZ", Some("Zürich"));
        assert_eq!(queries.len(), 3);
        assert_eq!(queries[2], "\"EWZ\" Zürich PLZ Versorgungsgebiet");
    }

    #[test]
    fn test_offering_queries() {
        let queries = offering_queries("Regionalwerke Baden");
        assert_eq!(queries.len(), 3);
        assert!(queries[1].contains("GemeinsamStrom OR LEGhub"));
    }
}
