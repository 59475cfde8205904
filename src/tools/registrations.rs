//! Buildings, consents, referrals and clusters.

use super::context::ToolContext;
use super::macros::handler;
use super::{ParsedArgs, limit_arg, row_or, rows_value};
use crate::error::ToolkitResult;
use crate::sql::{SelectBuilder, SqlFragment, UpdateBuilder};
use crate::tools::registry::ToolSpec;
use crate::tools::schema::ParamSpec;
use serde_json::{Value, json};
use std::sync::Arc;

pub fn tools() -> Vec<ToolSpec> {
    vec![
        ToolSpec::read(
            "search_registrations",
            "Search buildings/registrations by address, email, PLZ, building type",
            handler!(search_registrations),
        )
        .param(ParamSpec::text("query").optional().describe("Free text search (address, email)"))
        .param(ParamSpec::text("plz").optional().describe("Filter by postal code"))
        .param(ParamSpec::text("building_type").optional().describe("Filter: house, apartment"))
        .param(ParamSpec::boolean("verified_only").default(true).describe("Only verified registrations"))
        .param(ParamSpec::integer("limit").default(20).describe("Max results")),
        ToolSpec::read(
            "get_registration",
            "Get full details of a building: consents, cluster, referrals, communities",
            handler!(get_registration),
        )
        .param(ParamSpec::text("building_id").describe("Building ID")),
        ToolSpec::write(
            "update_registration",
            "Update building/registration fields",
            handler!(update_registration),
        )
        .param(ParamSpec::text("building_id").describe("Building ID"))
        .param(ParamSpec::text("email").optional())
        .param(ParamSpec::text("phone").optional())
        .param(ParamSpec::text("building_type").optional())
        .param(ParamSpec::number("annual_consumption_kwh").optional())
        .param(ParamSpec::number("potential_pv_kwp").optional()),
        ToolSpec::write(
            "add_note",
            "Add an internal note for a building",
            handler!(add_note),
        )
        .param(ParamSpec::text("building_id").describe("Building ID"))
        .param(ParamSpec::text("note").describe("Note content"))
        .param(ParamSpec::text("author").default("admin").describe("Recorded note author")),
        ToolSpec::write(
            "update_consent",
            "Update consent flags for a building",
            handler!(update_consent),
        )
        .param(ParamSpec::text("building_id").describe("Building ID"))
        .param(ParamSpec::boolean("share_with_neighbors").optional())
        .param(ParamSpec::boolean("share_with_utility").optional())
        .param(ParamSpec::boolean("updates_opt_in").optional()),
        ToolSpec::read(
            "get_referrals",
            "Referral leaderboard: top referrers with successful referral count",
            handler!(get_referrals),
        )
        .param(ParamSpec::integer("limit").default(10)),
        ToolSpec::read(
            "get_street_leaderboard",
            "Streets ranked by building count, communities, referrals",
            handler!(get_street_leaderboard),
        )
        .param(ParamSpec::integer("limit").default(10)),
        ToolSpec::read(
            "get_cluster_details",
            "Get cluster info with all member buildings",
            handler!(get_cluster_details),
        )
        .param(ParamSpec::integer("cluster_id").describe("Cluster ID")),
        ToolSpec::read(
            "get_stats",
            "Dashboard stats: registrations, clusters, communities, referrals, emails",
            handler!(get_stats),
        ),
    ]
}

async fn search_registrations(ctx: Arc<ToolContext>, args: ParsedArgs) -> ToolkitResult<Value> {
    let query = SelectBuilder::new(
        "SELECT b.building_id, b.email, b.phone, b.address, b.plz, b.building_type,
                b.annual_consumption_kwh, b.potential_pv_kwp, b.registered_at, b.verified,
                b.user_type, b.referral_code, c.cluster_id,
                co.share_with_neighbors, co.updates_opt_in
         FROM buildings b
         LEFT JOIN clusters c ON c.building_id = b.building_id
         LEFT JOIN consents co ON co.building_id = b.building_id",
    )
    .condition_if(args.flag("verified_only")?, "b.verified = true")
    .ilike_any(&["b.address", "b.email"], args.opt_text("query").as_deref())
    .eq("b.plz", args.opt_text("plz"))
    .eq("b.building_type", args.opt_text("building_type"))
    .order_by("b.registered_at DESC")
    .limit(limit_arg(&args)?)
    .build();

    Ok(rows_value(ctx.db.rows(&query).await?))
}

async fn get_registration(ctx: Arc<ToolContext>, args: ParsedArgs) -> ToolkitResult<Value> {
    let building_id = args.text("building_id")?;

    let building = ctx
        .db
        .first(
            &SqlFragment::new(
                "SELECT b.*, c.cluster_id, ci.autarky_percent, ci.num_members,
                        co.share_with_neighbors, co.share_with_utility, co.updates_opt_in
                 FROM buildings b
                 LEFT JOIN clusters c ON c.building_id = b.building_id
                 LEFT JOIN cluster_info ci ON ci.cluster_id = c.cluster_id
                 LEFT JOIN consents co ON co.building_id = b.building_id
                 WHERE b.building_id = $1",
            )
            .bind(building_id.as_str()),
        )
        .await?;
    let building = row_or(building, "Not found")?;

    let referrals = ctx
        .db
        .rows(
            &SqlFragment::new(
                "SELECT r.id, b.address, b.email, r.created_at
                 FROM referrals r JOIN buildings b ON b.building_id = r.referred_id
                 WHERE r.referrer_id = $1",
            )
            .bind(building_id.as_str()),
        )
        .await?;

    let communities = ctx
        .db
        .rows(
            &SqlFragment::new(
                "SELECT cm.community_id, com.name, com.status, cm.role, cm.status AS member_status
                 FROM community_members cm
                 JOIN communities com ON com.community_id = cm.community_id
                 WHERE cm.building_id = $1",
            )
            .bind(building_id.as_str()),
        )
        .await?;

    Ok(json!({
        "building": building,
        "referrals_made": rows_value(referrals),
        "communities": rows_value(communities),
    }))
}

async fn update_registration(ctx: Arc<ToolContext>, args: ParsedArgs) -> ToolkitResult<Value> {
    ctx.gate.check()?;

    let update = UpdateBuilder::new("buildings")
        .key("building_id", args.text("building_id")?)
        .set("email", args.opt_text("email"))
        .set("phone", args.opt_text("phone"))
        .set("building_type", args.opt_text("building_type"))
        .set("annual_consumption_kwh", args.opt_value("annual_consumption_kwh"))
        .set("potential_pv_kwp", args.opt_value("potential_pv_kwp"))
        .touch()
        .build()?;

    row_or(ctx.db.first(&update).await?, "Not found")
}

async fn add_note(ctx: Arc<ToolContext>, args: ParsedArgs) -> ToolkitResult<Value> {
    ctx.gate.check()?;

    let data = json!({ "note": args.text("note")?, "author": args.text("author")? });
    let insert = SqlFragment::new(
        "INSERT INTO analytics_events (event_type, building_id, data, created_at)
         VALUES ('internal_note', $1, $2, NOW()) RETURNING *",
    )
    .bind(args.text("building_id")?)
    .bind(data);

    row_or(ctx.db.first(&insert).await?, "Not found")
}

async fn update_consent(ctx: Arc<ToolContext>, args: ParsedArgs) -> ToolkitResult<Value> {
    ctx.gate.check()?;

    let update = UpdateBuilder::new("consents")
        .key("building_id", args.text("building_id")?)
        .set("share_with_neighbors", args.opt_flag("share_with_neighbors"))
        .set("share_with_utility", args.opt_flag("share_with_utility"))
        .set("updates_opt_in", args.opt_flag("updates_opt_in"))
        .build()?;

    row_or(ctx.db.first(&update).await?, "Not found")
}

async fn get_referrals(ctx: Arc<ToolContext>, args: ParsedArgs) -> ToolkitResult<Value> {
    let query = SqlFragment::new(
        "SELECT b.building_id, b.address, b.email, b.referral_code,
                COUNT(r.id) AS referral_count
         FROM buildings b
         JOIN referrals r ON r.referrer_id = b.building_id
         GROUP BY b.building_id, b.address, b.email, b.referral_code
         ORDER BY referral_count DESC
         LIMIT $1",
    )
    .bind(limit_arg(&args)?);

    Ok(rows_value(ctx.db.rows(&query).await?))
}

async fn get_street_leaderboard(ctx: Arc<ToolContext>, args: ParsedArgs) -> ToolkitResult<Value> {
    let query = SqlFragment::new("SELECT * FROM street_stats ORDER BY building_count DESC LIMIT $1")
        .bind(limit_arg(&args)?);

    Ok(rows_value(ctx.db.rows(&query).await?))
}

async fn get_cluster_details(ctx: Arc<ToolContext>, args: ParsedArgs) -> ToolkitResult<Value> {
    let cluster_id = args.integer("cluster_id")?;

    let cluster = ctx
        .db
        .first(&SqlFragment::new("SELECT * FROM cluster_info WHERE cluster_id = $1").bind(cluster_id))
        .await?;
    let members = ctx
        .db
        .rows(
            &SqlFragment::new(
                "SELECT b.building_id, b.address, b.email, b.building_type,
                        b.annual_consumption_kwh, b.potential_pv_kwp, b.verified
                 FROM clusters c JOIN buildings b ON b.building_id = c.building_id
                 WHERE c.cluster_id = $1",
            )
            .bind(cluster_id),
        )
        .await?;

    Ok(json!({
        "cluster": cluster.map(Value::Object),
        "members": rows_value(members),
    }))
}

async fn get_stats(ctx: Arc<ToolContext>, _args: ParsedArgs) -> ToolkitResult<Value> {
    let buildings = ctx
        .db
        .first(&SqlFragment::new(
            "SELECT
               COUNT(*) AS total_buildings,
               COUNT(*) FILTER (WHERE verified = true) AS verified,
               COUNT(*) FILTER (WHERE user_type = 'registered') AS registered,
               COUNT(*) FILTER (WHERE user_type = 'anonymous') AS anonymous
             FROM buildings",
        ))
        .await?;
    let clusters = ctx
        .db
        .first(&SqlFragment::new(
            "SELECT COUNT(DISTINCT cluster_id) AS total_clusters,
                    AVG(num_members) AS avg_members,
                    AVG(autarky_percent) AS avg_autarky
             FROM cluster_info",
        ))
        .await?;
    let communities = ctx
        .db
        .rows(&SqlFragment::new(
            "SELECT status, COUNT(*) AS count FROM communities GROUP BY status",
        ))
        .await?;
    let referrals = ctx
        .db
        .first(&SqlFragment::new("SELECT COUNT(*) AS total FROM referrals"))
        .await?;
    let emails = ctx
        .db
        .rows(&SqlFragment::new(
            "SELECT status, COUNT(*) AS count FROM scheduled_emails GROUP BY status",
        ))
        .await?;
    let recent = ctx
        .db
        .rows(&SqlFragment::new(
            "SELECT building_id, address, email, registered_at, verified
             FROM buildings ORDER BY registered_at DESC LIMIT 5",
        ))
        .await?;

    let referral_total = referrals
        .as_ref()
        .and_then(|row| row.get("total"))
        .and_then(crate::db::types::as_f64)
        .unwrap_or_default() as i64;

    Ok(json!({
        "buildings": buildings.map(Value::Object),
        "clusters": clusters.map(Value::Object),
        "communities": rows_value(communities),
        "referrals": { "total": referral_total },
        "emails": rows_value(emails),
        "recent_registrations": rows_value(recent),
    }))
}
