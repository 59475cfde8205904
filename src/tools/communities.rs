//! Communities, formation progress and scheduled emails.

use super::context::ToolContext;
use super::macros::handler;
use super::{ParsedArgs, limit_arg, row_or, rows_value};
use crate::db::SqlValue;
use crate::error::{ToolkitError, ToolkitResult};
use crate::scoring::formation_progress;
use crate::sql::{SelectBuilder, SqlFragment, UpdateBuilder};
use crate::tools::registry::ToolSpec;
use crate::tools::schema::ParamSpec;
use serde_json::{Value, json};
use std::sync::Arc;

pub const COMMUNITY_STATUSES: &[&str] = &[
    "interested",
    "formation_started",
    "dso_submitted",
    "dso_approved",
    "active",
    "rejected",
];

pub const MEMBER_STATUSES: &[&str] = &["invited", "confirmed", "rejected"];

pub fn tools() -> Vec<ToolSpec> {
    vec![
        ToolSpec::read(
            "list_communities",
            "List all communities with status, member count, admin info",
            handler!(list_communities),
        )
        .param(ParamSpec::one_of("status", COMMUNITY_STATUSES).optional())
        .param(ParamSpec::integer("limit").default(50)),
        ToolSpec::read(
            "get_community",
            "Get community details with all members",
            handler!(get_community),
        )
        .param(ParamSpec::text("community_id").describe("Community ID")),
        ToolSpec::write(
            "create_community",
            "Manually create a new community with its admin as confirmed member",
            handler!(create_community),
        )
        .param(ParamSpec::text("name").describe("Community name"))
        .param(ParamSpec::text("admin_building_id").describe("Building ID of community admin"))
        .param(
            ParamSpec::text("distribution_model")
                .default("proportional")
                .describe("simple, proportional, or custom"),
        )
        .param(ParamSpec::text("description").optional()),
        ToolSpec::write(
            "update_community_status",
            "Move community through formation stages",
            handler!(update_community_status),
        )
        .param(ParamSpec::text("community_id").describe("Community ID"))
        .param(ParamSpec::one_of("status", COMMUNITY_STATUSES)),
        ToolSpec::write(
            "update_formation_step",
            "Update community member status (invited/confirmed/rejected)",
            handler!(update_formation_step),
        )
        .param(ParamSpec::text("community_id").describe("Community ID"))
        .param(ParamSpec::text("building_id").describe("Building ID"))
        .param(ParamSpec::one_of("status", MEMBER_STATUSES)),
        ToolSpec::write(
            "add_community_member",
            "Add a building to a community as invited member",
            handler!(add_community_member),
        )
        .param(ParamSpec::text("community_id").describe("Community ID"))
        .param(ParamSpec::text("building_id").describe("Building ID to add"))
        .param(ParamSpec::text("role").default("member").describe("member or admin"))
        .param(ParamSpec::text("invited_by").optional().describe("Building ID of inviter")),
        ToolSpec::read(
            "get_formation_status",
            "Formation progress for a community: status, timestamps, member confirmations",
            handler!(get_formation_status),
        )
        .param(ParamSpec::text("community_id").describe("Community ID")),
        ToolSpec::read(
            "get_stuck_formations",
            "Communities stuck at the same status for N days, with admin contact",
            handler!(get_stuck_formations),
        )
        .param(
            ParamSpec::integer("days_threshold")
                .default(7)
                .describe("Minimum days stuck at same status"),
        ),
        ToolSpec::read(
            "list_scheduled_emails",
            "List scheduled emails with status and template info",
            handler!(list_scheduled_emails),
        )
        .param(
            ParamSpec::text("status")
                .optional()
                .describe("Filter: pending, sent, failed, cancelled"),
        )
        .param(ParamSpec::text("building_id").optional())
        .param(ParamSpec::integer("limit").default(20)),
        ToolSpec::write(
            "trigger_email",
            "Schedule an email to a building",
            handler!(trigger_email),
        )
        .param(ParamSpec::text("building_id").describe("Building ID"))
        .param(ParamSpec::text("template_key").describe("Email template key"))
        .param(ParamSpec::text("send_at").optional().describe("ISO timestamp, defaults to now")),
    ]
}

/// `com_<millis>_<6 hex>`.
pub fn new_community_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "com_{}_{}",
        chrono::Utc::now().timestamp_millis(),
        &suffix[..6]
    )
}

/// Timestamp column stamped when a community enters `status`.
pub fn status_timestamp_column(status: &str) -> Option<&'static str> {
    match status {
        "formation_started" => Some("formation_started_at"),
        "dso_submitted" => Some("dso_submitted_at"),
        "dso_approved" => Some("dso_approved_at"),
        "active" => Some("activated_at"),
        _ => None,
    }
}

async fn list_communities(ctx: Arc<ToolContext>, args: ParsedArgs) -> ToolkitResult<Value> {
    let query = SelectBuilder::new(
        "SELECT com.*, b.address AS admin_address, b.email AS admin_email,
                (SELECT COUNT(*) FROM community_members cm
                 WHERE cm.community_id = com.community_id) AS member_count
         FROM communities com
         LEFT JOIN buildings b ON b.building_id = com.admin_building_id",
    )
    .eq("com.status", args.opt_text("status"))
    .order_by("com.created_at DESC")
    .limit(limit_arg(&args)?)
    .build();

    Ok(rows_value(ctx.db.rows(&query).await?))
}

async fn get_community(ctx: Arc<ToolContext>, args: ParsedArgs) -> ToolkitResult<Value> {
    let community_id = args.text("community_id")?;

    let community = ctx
        .db
        .first(
            &SqlFragment::new("SELECT * FROM communities WHERE community_id = $1")
                .bind(community_id.as_str()),
        )
        .await?;
    let community = row_or(community, "Not found")?;

    let members = ctx
        .db
        .rows(
            &SqlFragment::new(
                "SELECT cm.*, b.address, b.email, b.phone, b.building_type,
                        b.annual_consumption_kwh, b.potential_pv_kwp
                 FROM community_members cm
                 JOIN buildings b ON b.building_id = cm.building_id
                 WHERE cm.community_id = $1
                 ORDER BY cm.role DESC, cm.joined_at",
            )
            .bind(community_id.as_str()),
        )
        .await?;
    let documents = ctx
        .db
        .first(
            &SqlFragment::new("SELECT * FROM community_documents WHERE community_id = $1")
                .bind(community_id.as_str()),
        )
        .await?;

    Ok(json!({
        "community": community,
        "members": rows_value(members),
        "documents": documents.map(Value::Object),
    }))
}

async fn create_community(ctx: Arc<ToolContext>, args: ParsedArgs) -> ToolkitResult<Value> {
    ctx.gate.check()?;

    let community_id = new_community_id();
    let admin_building_id = args.text("admin_building_id")?;

    let statements = [
        SqlFragment::new(
            "INSERT INTO communities (community_id, name, admin_building_id, distribution_model,
                                      description, status, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, 'interested', NOW(), NOW()) RETURNING *",
        )
        .bind(community_id.as_str())
        .bind(args.text("name")?)
        .bind(admin_building_id.as_str())
        .bind(args.text("distribution_model")?)
        .bind(args.opt_text("description").unwrap_or_default()),
        SqlFragment::new(
            "INSERT INTO community_members (community_id, building_id, role, status,
                                            joined_at, confirmed_at)
             VALUES ($1, $2, 'admin', 'confirmed', NOW(), NOW()) RETURNING community_id",
        )
        .bind(community_id.as_str())
        .bind(admin_building_id.as_str()),
    ];

    let outcomes = ctx.db.atomic(&statements).await?;
    let community = outcomes.into_iter().next().and_then(|o| o.into_first());
    community
        .map(Value::Object)
        .ok_or_else(|| ToolkitError::internal("community insert returned no row"))
}

async fn update_community_status(ctx: Arc<ToolContext>, args: ParsedArgs) -> ToolkitResult<Value> {
    ctx.gate.check()?;

    let status = args.text("status")?;
    let mut update = UpdateBuilder::new("communities")
        .key("community_id", args.text("community_id")?)
        .set("status", Some(status.as_str()))
        .touch();
    if let Some(column) = status_timestamp_column(&status) {
        update = update.stamp(column);
    }

    row_or(ctx.db.first(&update.build()?).await?, "Not found")
}

async fn update_formation_step(ctx: Arc<ToolContext>, args: ParsedArgs) -> ToolkitResult<Value> {
    ctx.gate.check()?;

    let status = args.text("status")?;
    let mut update = UpdateBuilder::new("community_members")
        .key("community_id", args.text("community_id")?)
        .key("building_id", args.text("building_id")?)
        .set("status", Some(status.as_str()));
    if status == "confirmed" {
        update = update.stamp("confirmed_at");
    }

    row_or(ctx.db.first(&update.build()?).await?, "Not found")
}

async fn add_community_member(ctx: Arc<ToolContext>, args: ParsedArgs) -> ToolkitResult<Value> {
    ctx.gate.check()?;

    let insert = SqlFragment::new(
        "INSERT INTO community_members (community_id, building_id, role, status, invited_by, joined_at)
         VALUES ($1, $2, $3, 'invited', $4::text, NOW())
         ON CONFLICT (community_id, building_id) DO NOTHING
         RETURNING *",
    )
    .bind(args.text("community_id")?)
    .bind(args.text("building_id")?)
    .bind(args.text("role")?)
    .bind(args.opt_text("invited_by"));

    ctx.db
        .first(&insert)
        .await?
        .map(Value::Object)
        .ok_or_else(|| ToolkitError::conflict("Already a member"))
}

async fn get_formation_status(ctx: Arc<ToolContext>, args: ParsedArgs) -> ToolkitResult<Value> {
    let community_id = args.text("community_id")?;

    let community = ctx
        .db
        .first(
            &SqlFragment::new(
                "SELECT community_id, name, status, distribution_model,
                        created_at, formation_started_at, dso_submitted_at, dso_approved_at,
                        activated_at
                 FROM communities WHERE community_id = $1",
            )
            .bind(community_id.as_str()),
        )
        .await?;
    let community = row_or(community, "Not found")?;

    let members = ctx
        .db
        .rows(
            &SqlFragment::new(
                "SELECT building_id, role, status, confirmed_at
                 FROM community_members WHERE community_id = $1",
            )
            .bind(community_id.as_str()),
        )
        .await?;

    let total = members.len();
    let confirmed = members
        .iter()
        .filter(|m| m.get("status").and_then(Value::as_str) == Some("confirmed"))
        .count();

    Ok(json!({
        "community": community,
        "members": rows_value(members),
        "progress": {
            "confirmed": confirmed,
            "total": total,
            "percent": formation_progress(confirmed, total),
        },
    }))
}

async fn get_stuck_formations(ctx: Arc<ToolContext>, args: ParsedArgs) -> ToolkitResult<Value> {
    let query = SqlFragment::new(
        "SELECT c.community_id, c.name, c.status,
                EXTRACT(DAY FROM NOW() - c.updated_at)::int AS days_stuck,
                b.email AS admin_email
         FROM communities c
         JOIN buildings b ON c.admin_building_id = b.building_id
         WHERE c.status NOT IN ('active', 'rejected')
           AND c.updated_at < NOW() - make_interval(days => $1::int)
         ORDER BY c.updated_at ASC",
    )
    .bind(args.integer("days_threshold")?);

    let rows = ctx.db.rows(&query).await?;
    Ok(json!({ "count": rows.len(), "stuck_formations": rows_value(rows) }))
}

async fn list_scheduled_emails(ctx: Arc<ToolContext>, args: ParsedArgs) -> ToolkitResult<Value> {
    let query = SelectBuilder::new(
        "SELECT se.*, b.address
         FROM scheduled_emails se
         LEFT JOIN buildings b ON b.building_id = se.building_id",
    )
    .eq("se.status", args.opt_text("status"))
    .eq("se.building_id", args.opt_text("building_id"))
    .order_by("se.send_at DESC")
    .limit(limit_arg(&args)?)
    .build();

    Ok(rows_value(ctx.db.rows(&query).await?))
}

async fn trigger_email(ctx: Arc<ToolContext>, args: ParsedArgs) -> ToolkitResult<Value> {
    ctx.gate.check()?;

    let building_id = args.text("building_id")?;
    let building = ctx
        .db
        .first(
            &SqlFragment::new("SELECT email FROM buildings WHERE building_id = $1")
                .bind(building_id.as_str()),
        )
        .await?
        .ok_or_else(|| ToolkitError::not_found("Building not found"))?;

    let email = building
        .get("email")
        .map(SqlValue::from_json)
        .unwrap_or(SqlValue::Null);
    let send_at = args
        .opt_text("send_at")
        .unwrap_or_else(|| chrono::Utc::now().to_rfc3339());

    let insert = SqlFragment::new(
        "INSERT INTO scheduled_emails (building_id, email, template_key, send_at, status, created_at)
         VALUES ($1, $2::text, $3, $4::timestamptz, 'pending', NOW()) RETURNING *",
    )
    .bind(building_id)
    .bind(email)
    .bind(args.text("template_key")?)
    .bind(send_at);

    row_or(ctx.db.first(&insert).await?, "Not found")
}
