// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn work_response_serializes_package_as_explicit_null() {
    let resp = WorkResponse::package(None);
    let json = serde_json::to_value(&resp).unwrap();
    assert_eq!(json, serde_json::json!({"package": null}));
}

#[test]
fn work_response_serializes_package_value() {
    let resp = WorkResponse::package(Some("=a/b-1".to_string()));
    let json = serde_json::to_value(&resp).unwrap();
    assert_eq!(json, serde_json::json!({"package": "=a/b-1"}));
}

#[test]
fn work_response_serializes_directive_with_extra_fields() {
    let mut extra = serde_json::Map::new();
    extra.insert("drone_id".to_string(), serde_json::json!("node_abc"));
    let resp = WorkResponse::Directive { action: "reboot".to_string(), extra };
    let json = serde_json::to_value(&resp).unwrap();
    assert_eq!(json, serde_json::json!({"action": "reboot", "drone_id": "node_abc"}));
}

#[test]
fn nodes_response_orchestrators_always_empty() {
    let resp = NodesResponse { drones: vec![], orchestrators: vec![] };
    let json = serde_json::to_value(&resp).unwrap();
    assert_eq!(json["orchestrators"], serde_json::json!([]));
}

#[test]
fn control_response_flattens_extra_counters() {
    let resp = ControlResponse::with("ok", "unblocked", 3u64);
    let json = serde_json::to_value(&resp).unwrap();
    assert_eq!(json, serde_json::json!({"status": "ok", "unblocked": 3}));
}

#[test]
fn control_response_with_no_extra_is_just_status() {
    let resp = ControlResponse::status("paused");
    let json = serde_json::to_value(&resp).unwrap();
    assert_eq!(json, serde_json::json!({"status": "paused"}));
}

#[test]
fn register_response_omits_paused_when_false_is_absent() {
    let resp = RegisterResponse {
        status: "registered".to_string(),
        orchestrator: "10.0.0.1".to_string(),
        orchestrator_port: 8100,
        orchestrator_name: "build-swarm-v3".to_string(),
        paused: None,
    };
    let json = serde_json::to_value(&resp).unwrap();
    assert!(json.get("paused").is_none());
}
