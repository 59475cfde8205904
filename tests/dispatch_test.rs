//! Registry-wide dispatch behavior against a recording fake database.

mod common;

use common::{RecordingDatabase, dispatcher, tenant_config};
use leg_toolkit::error::ToolkitError;
use leg_toolkit::tools::{ParamSpec, ParamType, RawArgs, ToolOutcome, ToolSpec};
use serde_json::{Value, json};
use std::sync::Arc;

/// A value every handler accepts for this parameter.
fn sample(param: &ParamSpec) -> Value {
    match (param.name, &param.ty) {
        ("territory", _) => json!("baden"),
        ("config", _) => tenant_config(),
        ("start_date", _) => json!("2026-01-01"),
        ("end_date", _) => json!("2026-03-31"),
        ("month", _) => json!("2026-02"),
        ("kanton", _) => json!("AG"),
        ("send_at", _) => json!("2026-05-01T08:00:00Z"),
        (_, ParamType::Enum(options)) => json!(options[0]),
        (_, ParamType::Integer) => json!(4021),
        (_, ParamType::Number) => json!(12.5),
        (_, ParamType::Boolean) => json!(true),
        (_, ParamType::Json(_)) => json!({}),
        (_, ParamType::Text) => json!("b-1"),
    }
}

fn required_args(spec: &ToolSpec) -> RawArgs {
    spec.params
        .iter()
        .filter(|p| p.is_required())
        .map(|p| (p.name.to_string(), sample(p)))
        .collect()
}

#[tokio::test]
async fn test_every_tool_passes_dispatch_boundary() {
    let db = Arc::new(RecordingDatabase::new());
    let dispatcher = dispatcher(db, false);
    let names: Vec<&'static str> = dispatcher.registry().iter().map(|s| s.name).collect();
    assert_eq!(names.len(), 44);

    for name in names {
        let spec = dispatcher.registry().get(name).unwrap();
        match dispatcher.dispatch(name, required_args(spec)).await {
            Ok(_) => {}
            Err(e) => assert!(
                !e.is_dispatch(),
                "{} failed at the dispatch boundary: {}",
                name,
                e
            ),
        }
    }
}

#[tokio::test]
async fn test_unknown_tool() {
    let dispatcher = dispatcher(Arc::new(RecordingDatabase::new()), false);
    let err = dispatcher
        .dispatch("drop_everything", RawArgs::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ToolkitError::UnknownTool { ref name } if name == "drop_everything"));
    assert!(err.suggestion().unwrap().contains("invoke help"));
}

#[tokio::test]
async fn test_missing_required_parameter() {
    let db = Arc::new(RecordingDatabase::new());
    let dispatcher = dispatcher(db.clone(), false);
    let err = dispatcher
        .dispatch("get_registration", RawArgs::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ToolkitError::MissingParameter { ref tool, ref parameter }
            if tool == "get_registration" && parameter == "building_id"
    ));
    assert_eq!(db.call_count(), 0);
}

#[tokio::test]
async fn test_null_counts_as_missing() {
    let dispatcher = dispatcher(Arc::new(RecordingDatabase::new()), false);
    let mut args = RawArgs::new();
    args.insert("building_id".into(), Value::Null);
    let err = dispatcher.dispatch("get_registration", args).await.unwrap_err();
    assert!(matches!(err, ToolkitError::MissingParameter { .. }));
}

#[tokio::test]
async fn test_cli_text_is_coerced() {
    let db = Arc::new(RecordingDatabase::new());
    let dispatcher = dispatcher(db.clone(), false);
    let mut args = RawArgs::new();
    args.insert("limit".into(), json!("7"));
    args.insert("verified_only".into(), json!("true"));
    let outcome = dispatcher.dispatch("search_registrations", args).await.unwrap();
    assert!(matches!(outcome, ToolOutcome::Success(Value::Array(_))));

    let calls = db.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].sql.contains("LIMIT"));
}

#[tokio::test]
async fn test_bad_values_are_invalid_parameters() {
    let dispatcher = dispatcher(Arc::new(RecordingDatabase::new()), false);

    let mut args = RawArgs::new();
    args.insert("limit".into(), json!("seven"));
    let err = dispatcher.dispatch("search_registrations", args).await.unwrap_err();
    assert!(matches!(err, ToolkitError::InvalidParameter { ref parameter, .. } if parameter == "limit"));

    let mut args = RawArgs::new();
    args.insert("vnb_id".into(), json!(3));
    args.insert("status".into(), json!("won"));
    let err = dispatcher.dispatch("update_vnb_status", args).await.unwrap_err();
    assert!(err.to_string().contains("lead, contacted, demo, trial, paid, churned"));
}

#[tokio::test]
async fn test_not_found_is_domain_failure() {
    let dispatcher = dispatcher(Arc::new(RecordingDatabase::empty()), false);
    let mut args = RawArgs::new();
    args.insert("community_id".into(), json!("leg-404"));
    let outcome = dispatcher.dispatch("get_community", args).await.unwrap();
    assert!(outcome.is_failure());
    assert!(outcome.to_value()["error"].is_string());
}

#[tokio::test]
async fn test_score_vnb_is_pure() {
    let db = Arc::new(RecordingDatabase::new());
    let dispatcher = dispatcher(db.clone(), true);

    let mut args = RawArgs::new();
    args.insert("population".into(), json!(60000));
    args.insert("solar_potential_pct".into(), json!(80));
    args.insert("has_leghub".into(), json!(true));
    args.insert("smart_meter_rollout_pct".into(), json!(100));
    let hot = dispatcher.dispatch("score_vnb", args).await.unwrap().to_value();
    assert_eq!(hot["score"], 95);
    assert_eq!(hot["tier"], "hot");

    let mut args = RawArgs::new();
    args.insert("population".into(), json!(1000));
    args.insert("solar_potential_pct".into(), json!(0));
    args.insert("has_leghub".into(), json!(false));
    args.insert("smart_meter_rollout_pct".into(), json!(0));
    let cold = dispatcher.dispatch("score_vnb", args).await.unwrap().to_value();
    assert_eq!(cold["score"], 10);
    assert_eq!(cold["tier"], "cold");

    assert_eq!(db.call_count(), 0);
}

#[tokio::test]
async fn test_create_community_is_one_transaction() {
    let db = Arc::new(RecordingDatabase::new());
    let dispatcher = dispatcher(db.clone(), false);
    let spec = dispatcher.registry().get("create_community").unwrap();
    let outcome = dispatcher
        .dispatch("create_community", required_args(spec))
        .await
        .unwrap();
    assert!(!outcome.is_failure());

    let calls = db.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].sql.contains("INSERT INTO communities"));
    assert!(calls[1].sql.contains("INSERT INTO community_members"));
}
