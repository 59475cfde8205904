//! VNB sales pipeline and lead scoring.

use super::context::ToolContext;
use super::macros::handler;
use super::{ParsedArgs, limit_arg, row_or, rows_value};
use crate::db::types::as_f64;
use crate::db::Row;
use crate::error::{ToolkitError, ToolkitResult};
use crate::scoring::{conversion_rate, score_vnb as score};
use crate::sql::{SelectBuilder, SqlFragment};
use crate::tools::registry::ToolSpec;
use crate::tools::schema::ParamSpec;
use serde_json::{Value, json};
use std::sync::Arc;

pub const PIPELINE_STAGES: &[&str] = &["lead", "contacted", "demo", "trial", "paid", "churned"];

pub fn tools() -> Vec<ToolSpec> {
    vec![
        ToolSpec::read(
            "get_vnb_pipeline",
            "VNB sales pipeline entries, best score first",
            handler!(get_vnb_pipeline),
        )
        .param(ParamSpec::one_of("status", PIPELINE_STAGES).optional())
        .param(ParamSpec::integer("limit").default(50).describe("Max results")),
        ToolSpec::read(
            "get_pipeline_dashboard",
            "Pipeline funnel: counts per stage, average score, conversion rate",
            handler!(get_pipeline_dashboard),
        ),
        ToolSpec::write(
            "update_vnb_status",
            "Update a VNB pipeline entry's status and notes",
            handler!(update_vnb_status),
        )
        .param(ParamSpec::integer("vnb_id").describe("Pipeline entry ID"))
        .param(ParamSpec::one_of("status", PIPELINE_STAGES))
        .param(
            ParamSpec::text("notes")
                .optional()
                .describe("Notes about the status change"),
        ),
        ToolSpec::write(
            "add_vnb_lead",
            "Add a new VNB to the sales pipeline as lead",
            handler!(add_vnb_lead),
        )
        .param(ParamSpec::text("vnb_name").describe("Name of the VNB/utility"))
        .param(ParamSpec::text("municipality").optional().describe("Primary municipality"))
        .param(ParamSpec::integer("bfs_number").optional())
        .param(ParamSpec::integer("population").optional().describe("Population served"))
        .param(ParamSpec::number("score").optional().describe("Lead score 0-100"))
        .param(ParamSpec::text("notes").optional().describe("Research notes")),
        ToolSpec::read(
            "score_vnb",
            "Score a VNB/utility as expansion target (pure computation)",
            handler!(score_vnb),
        )
        .param(ParamSpec::number("population").describe("Municipality population"))
        .param(
            ParamSpec::number("solar_potential_pct")
                .describe("Solar potential percentage (0-100)"),
        )
        .param(ParamSpec::boolean("has_leghub").describe("Whether VNB is on LEGHub platform"))
        .param(
            ParamSpec::number("smart_meter_rollout_pct")
                .describe("Smart meter rollout percentage (0-100)"),
        ),
    ]
}

async fn get_vnb_pipeline(ctx: Arc<ToolContext>, args: ParsedArgs) -> ToolkitResult<Value> {
    let query = SelectBuilder::new("SELECT * FROM vnb_pipeline")
        .eq("status", args.opt_text("status"))
        .order_by("score DESC NULLS LAST")
        .limit(limit_arg(&args)?)
        .build();

    Ok(rows_value(ctx.db.rows(&query).await?))
}

fn stage_count(row: &Row) -> i64 {
    row.get("count").and_then(as_f64).unwrap_or(0.0) as i64
}

/// Funnel totals and conversion rate from per-stage rows.
pub fn funnel_summary(funnel: &[Row]) -> (i64, f64) {
    let total: i64 = funnel.iter().map(stage_count).sum();
    let paid = funnel
        .iter()
        .find(|row| row.get("status").and_then(Value::as_str) == Some("paid"))
        .map(stage_count)
        .unwrap_or(0);
    (total, conversion_rate(paid, total))
}

async fn get_pipeline_dashboard(ctx: Arc<ToolContext>, _args: ParsedArgs) -> ToolkitResult<Value> {
    let funnel = ctx
        .db
        .rows(&SqlFragment::new(
            "SELECT status, COUNT(*)::int AS count, ROUND(AVG(score)::numeric, 1) AS avg_score
             FROM vnb_pipeline GROUP BY status ORDER BY
               CASE status WHEN 'lead' THEN 1 WHEN 'contacted' THEN 2 WHEN 'demo' THEN 3
               WHEN 'trial' THEN 4 WHEN 'paid' THEN 5 WHEN 'churned' THEN 6 END",
        ))
        .await?;

    let (total, rate) = funnel_summary(&funnel);
    Ok(json!({
        "funnel": rows_value(funnel),
        "total": total,
        "conversion_rate": rate,
    }))
}

async fn update_vnb_status(ctx: Arc<ToolContext>, args: ParsedArgs) -> ToolkitResult<Value> {
    ctx.gate.check()?;

    let update = SqlFragment::new(
        "UPDATE vnb_pipeline SET status = $2, notes = COALESCE($3::text, notes), updated_at = NOW()
         WHERE id = $1 RETURNING *",
    )
    .bind(args.integer("vnb_id")?)
    .bind(args.text("status")?)
    .bind(args.opt_text("notes"));

    row_or(ctx.db.first(&update).await?, "Not found")
}

async fn add_vnb_lead(ctx: Arc<ToolContext>, args: ParsedArgs) -> ToolkitResult<Value> {
    ctx.gate.check()?;

    let insert = SqlFragment::new(
        "INSERT INTO vnb_pipeline (vnb_name, municipality, bfs_number, population, score, notes,
                                   status, created_at, updated_at)
         VALUES ($1, $2::text, $3::int, $4::int, $5::numeric, $6::text, 'lead', NOW(), NOW())
         RETURNING *",
    )
    .bind(args.text("vnb_name")?)
    .bind(args.opt_text("municipality"))
    .bind(args.opt_integer("bfs_number"))
    .bind(args.opt_integer("population"))
    .bind(args.opt_number("score"))
    .bind(args.opt_text("notes"));

    ctx.db
        .first(&insert)
        .await?
        .map(Value::Object)
        .ok_or_else(|| ToolkitError::internal("lead insert returned no row"))
}

async fn score_vnb(_ctx: Arc<ToolContext>, args: ParsedArgs) -> ToolkitResult<Value> {
    let result = score(
        args.number("population")?,
        args.number("solar_potential_pct")?,
        args.flag("has_leghub")?,
        args.number("smart_meter_rollout_pct")?,
    );
    Ok(json!(result))
}
