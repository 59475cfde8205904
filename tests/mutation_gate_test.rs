//! Read-only mode: every mutating tool is refused before any side effect.

mod common;

use common::{RecordingDatabase, dispatcher, tenant_config};
use leg_toolkit::error::MUTATION_DISABLED_MESSAGE;
use leg_toolkit::tools::{RawArgs, ToolOutcome};
use serde_json::{Value, json};
use std::sync::Arc;

const MUTATING_TOOLS: &[&str] = &[
    "update_registration",
    "add_note",
    "update_consent",
    "create_community",
    "update_community_status",
    "update_formation_step",
    "add_community_member",
    "trigger_email",
    "upsert_tenant",
    "update_vnb_status",
    "add_vnb_lead",
    "generate_leg_document",
];

fn args(pairs: &[(&str, Value)]) -> RawArgs {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// Fully valid arguments, so only the gate can refuse the call.
fn valid_args(tool: &str) -> RawArgs {
    match tool {
        "update_registration" => args(&[
            ("building_id", json!("b-1")),
            ("phone", json!("+41 56 000 00 00")),
        ]),
        "add_note" => args(&[("building_id", json!("b-1")), ("note", json!("Rückruf am Montag"))]),
        "update_consent" => args(&[
            ("building_id", json!("b-1")),
            ("share_with_neighbors", json!(true)),
        ]),
        "create_community" => args(&[
            ("name", json!("LEG Martinsberg")),
            ("admin_building_id", json!("b-1")),
            ("distribution_model", json!("simple")),
        ]),
        "update_community_status" => args(&[
            ("community_id", json!("leg-1")),
            ("status", json!("formation_started")),
        ]),
        "update_formation_step" => args(&[
            ("community_id", json!("leg-1")),
            ("building_id", json!("b-2")),
            ("status", json!("confirmed")),
        ]),
        "add_community_member" => args(&[
            ("community_id", json!("leg-1")),
            ("building_id", json!("b-2")),
        ]),
        "trigger_email" => args(&[
            ("building_id", json!("b-1")),
            ("template_key", json!("welcome")),
        ]),
        "upsert_tenant" => args(&[
            ("territory", json!("baden")),
            ("config", tenant_config()),
            ("utility_name", json!("Regionalwerke AG Baden")),
        ]),
        "update_vnb_status" => args(&[("vnb_id", json!(3)), ("status", json!("contacted"))]),
        "add_vnb_lead" => args(&[("vnb_name", json!("EW Wettingen"))]),
        "generate_leg_document" => args(&[
            ("community_id", json!("leg-1")),
            ("doc_type", json!("reglement")),
        ]),
        other => panic!("no arguments for {}", other),
    }
}

#[test]
fn test_mutating_flag_matches_registry() {
    let d = dispatcher(Arc::new(RecordingDatabase::new()), true);
    let mut flagged: Vec<&str> = d
        .registry()
        .iter()
        .filter(|spec| spec.mutating)
        .map(|spec| spec.name)
        .collect();
    flagged.sort_unstable();
    let mut expected = MUTATING_TOOLS.to_vec();
    expected.sort_unstable();
    assert_eq!(flagged, expected);
}

#[tokio::test]
async fn test_gate_refuses_every_mutating_tool() {
    let db = Arc::new(RecordingDatabase::new());
    // Upstream services are unreachable, so a document request that got
    // past the gate would surface as an error instead of the gate message.
    let d = dispatcher(db.clone(), true);

    for tool in MUTATING_TOOLS {
        let outcome = d.dispatch(tool, valid_args(tool)).await.unwrap();
        assert_eq!(
            outcome,
            ToolOutcome::Failure(MUTATION_DISABLED_MESSAGE.to_string()),
            "{} was not refused",
            tool
        );
    }
    assert_eq!(db.call_count(), 0);
}

#[tokio::test]
async fn test_reads_still_work_when_gated() {
    let db = Arc::new(RecordingDatabase::new());
    let d = dispatcher(db.clone(), true);
    let outcome = d.dispatch("get_stuck_formations", RawArgs::new()).await.unwrap();
    assert!(!outcome.is_failure());
    assert!(db.call_count() > 0);
}

#[tokio::test]
async fn test_open_gate_writes() {
    let db = Arc::new(RecordingDatabase::new());
    let d = dispatcher(db.clone(), false);
    let outcome = d.dispatch("add_vnb_lead", valid_args("add_vnb_lead")).await.unwrap();
    assert!(!outcome.is_failure());

    let calls = db.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].sql.contains("INSERT INTO vnb_pipeline"));
    assert_eq!(calls[0].params.len(), 6);
}
