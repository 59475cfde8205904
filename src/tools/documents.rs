//! LEG documents and billing periods.

use super::context::ToolContext;
use super::macros::handler;
use super::{ParsedArgs, rows_value};
use crate::db::types::as_f64;
use crate::db::Row;
use crate::error::{ToolkitError, ToolkitResult};
use crate::sql::SqlFragment;
use crate::tools::registry::ToolSpec;
use crate::tools::schema::ParamSpec;
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;

pub const DOCUMENT_TYPES: &[&str] = &["gruendungsvertrag", "reglement", "tarifblatt"];

pub fn tools() -> Vec<ToolSpec> {
    vec![
        ToolSpec::write(
            "generate_leg_document",
            "Generate a LEG document (Gründungsvertrag, Reglement, Tarifblatt) for a community",
            handler!(generate_leg_document),
        )
        .param(ParamSpec::text("community_id").describe("Community ID"))
        .param(ParamSpec::one_of("doc_type", DOCUMENT_TYPES).describe("Document type")),
        ToolSpec::read(
            "list_documents",
            "List all LEG documents of a community",
            handler!(list_documents),
        )
        .param(ParamSpec::text("community_id").describe("Community ID")),
        ToolSpec::read(
            "run_billing_period",
            "Billing periods of a community within a date range",
            handler!(run_billing_period),
        )
        .param(ParamSpec::text("community_id").describe("Community ID"))
        .param(ParamSpec::text("start_date").describe("Start date (YYYY-MM-DD)"))
        .param(ParamSpec::text("end_date").describe("End date (YYYY-MM-DD)")),
        ToolSpec::read(
            "get_billing_summary",
            "Billing line items of a community for one month, with totals",
            handler!(get_billing_summary),
        )
        .param(ParamSpec::text("community_id").describe("Community ID"))
        .param(ParamSpec::text("month").describe("Month (YYYY-MM)")),
    ]
}

fn parse_date(parameter: &str, value: &str) -> ToolkitResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ToolkitError::invalid_parameter(parameter, "expected a date as YYYY-MM-DD"))
}

fn check_month(month: &str) -> ToolkitResult<()> {
    NaiveDate::parse_from_str(&format!("{}-01", month), "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| ToolkitError::invalid_parameter("month", "expected a month as YYYY-MM"))
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct BillingTotals {
    pub consumption: f64,
    pub production: f64,
    pub amount: f64,
    pub count: usize,
}

impl BillingTotals {
    pub fn from_line_items(items: &[Row]) -> Self {
        items.iter().fold(Self::default(), |acc, item| {
            let value = |key: &str| item.get(key).and_then(as_f64).unwrap_or(0.0);
            Self {
                consumption: acc.consumption + value("consumption_kwh"),
                production: acc.production + value("production_kwh"),
                amount: acc.amount + value("amount_chf"),
                count: acc.count + 1,
            }
        })
    }
}

async fn generate_leg_document(ctx: Arc<ToolContext>, args: ParsedArgs) -> ToolkitResult<Value> {
    ctx.gate.check()?;
    ctx.documents
        .generate(&args.text("community_id")?, &args.text("doc_type")?)
        .await
}

async fn list_documents(ctx: Arc<ToolContext>, args: ParsedArgs) -> ToolkitResult<Value> {
    let query = SqlFragment::new(
        "SELECT id, community_id, doc_type, status, file_path, created_at, signed_at
         FROM leg_documents WHERE community_id = $1 ORDER BY created_at DESC",
    )
    .bind(args.text("community_id")?);

    Ok(rows_value(ctx.db.rows(&query).await?))
}

async fn run_billing_period(ctx: Arc<ToolContext>, args: ParsedArgs) -> ToolkitResult<Value> {
    let start = parse_date("start_date", &args.text("start_date")?)?;
    let end = parse_date("end_date", &args.text("end_date")?)?;
    if end < start {
        return Err(ToolkitError::invalid_parameter(
            "end_date",
            "must not be before start_date",
        ));
    }

    let query = SqlFragment::new(
        "SELECT id, community_id, period_start, period_end, status, total_consumption_kwh,
                total_production_kwh, self_consumption_kwh, grid_import_kwh, created_at
         FROM billing_periods
         WHERE community_id = $1 AND period_start >= $2::date AND period_end <= $3::date
         ORDER BY period_start",
    )
    .bind(args.text("community_id")?)
    .bind(start.to_string())
    .bind(end.to_string());

    Ok(rows_value(ctx.db.rows(&query).await?))
}

async fn get_billing_summary(ctx: Arc<ToolContext>, args: ParsedArgs) -> ToolkitResult<Value> {
    let community_id = args.text("community_id")?;
    let month = args.text("month")?;
    check_month(&month)?;

    let query = SqlFragment::new(
        "SELECT bli.building_id, bli.consumption_kwh, bli.production_kwh,
                bli.self_supply_kwh, bli.grid_import_kwh, bli.amount_chf,
                bli.self_supply_ratio, bp.period_start, bp.period_end
         FROM billing_line_items bli
         JOIN billing_periods bp ON bli.billing_period_id = bp.id
         WHERE bp.community_id = $1 AND to_char(bp.period_start, 'YYYY-MM') = $2
         ORDER BY bli.building_id",
    )
    .bind(community_id.as_str())
    .bind(month.as_str());

    let line_items = ctx.db.rows(&query).await?;
    let totals = BillingTotals::from_line_items(&line_items);

    Ok(json!({
        "month": month,
        "community_id": community_id,
        "line_items": rows_value(line_items),
        "totals": totals,
    }))
}
