// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn register_pulls_drone_id_and_name_from_request_body() {
    let fields = extract_fields(
        MessageType::Register,
        "/api/v1/register",
        "",
        r#"{"id":"node-1","name":"alpha"}"#,
        r#"{"status":"ok"}"#,
    );
    assert_eq!(fields.drone_id, Some(NodeId::from_string("node-1")));
    assert_eq!(fields.resolved_node_name, Some("alpha".to_string()));
}

#[test]
fn complete_pulls_drone_id_and_package_from_request_body() {
    let fields = extract_fields(
        MessageType::Complete,
        "/api/v1/complete",
        "",
        r#"{"id":"node-1","package":"dev-libs/foo-1.0","status":"success"}"#,
        r#"{"status":"ok","accepted":true}"#,
    );
    assert_eq!(fields.drone_id, Some(NodeId::from_string("node-1")));
    assert_eq!(fields.package, Some("dev-libs/foo-1.0".to_string()));
}

#[test]
fn control_pulls_optional_drone_id_from_request_body() {
    let fields = extract_fields(MessageType::Control, "/api/v1/control", "", r#"{"action":"unground","drone_id":"node-2"}"#, r#"{"status":"ok"}"#);
    assert_eq!(fields.drone_id, Some(NodeId::from_string("node-2")));
}

#[test]
fn control_without_drone_id_leaves_it_unset() {
    let fields = extract_fields(MessageType::Control, "/api/v1/control", "", r#"{"action":"pause"}"#, r#"{"status":"paused"}"#);
    assert_eq!(fields.drone_id, None);
}

#[test]
fn work_request_pulls_id_from_query_and_package_from_response() {
    let fields = extract_fields(MessageType::WorkRequest, "/api/v1/work", "id=node-3", "", r#"{"package":"dev-libs/bar-2.0"}"#);
    assert_eq!(fields.drone_id, Some(NodeId::from_string("node-3")));
    assert_eq!(fields.package, Some("dev-libs/bar-2.0".to_string()));
}

#[test]
fn queue_pulls_session_id_from_response() {
    let fields = extract_fields(MessageType::Queue, "/api/v1/queue", "", r#"{"packages":["a"]}"#, r#"{"status":"ok","queued":1,"session_id":"session-1"}"#);
    assert_eq!(fields.session_id, Some(SessionId::from_string("session-1")));
}

#[test]
fn node_pause_pulls_id_from_path_and_name_from_response() {
    let fields = extract_fields(MessageType::NodePause, "/api/v1/nodes/node-4/pause", "", "", r#"{"status":"paused","name":"delta"}"#);
    assert_eq!(fields.drone_id, Some(NodeId::from_string("node-4")));
    assert_eq!(fields.resolved_node_name, Some("delta".to_string()));
}

#[test]
fn node_delete_pulls_id_from_bare_path_segment() {
    let fields = extract_fields(MessageType::NodeDelete, "/api/v1/nodes/node-5", "", "", r#"{"status":"removed","name":"epsilon"}"#);
    assert_eq!(fields.drone_id, Some(NodeId::from_string("node-5")));
}

#[test]
fn unrelated_message_types_extract_nothing() {
    let fields = extract_fields(MessageType::HealthCheck, "/api/v1/health", "", "", r#"{"status":"ok"}"#);
    assert_eq!(fields.drone_id, None);
    assert_eq!(fields.package, None);
    assert_eq!(fields.session_id, None);
    assert_eq!(fields.resolved_node_name, None);
}

#[test]
fn malformed_bodies_never_panic() {
    let fields = extract_fields(MessageType::Complete, "/api/v1/complete", "", "not json", "also not json");
    assert_eq!(fields.drone_id, None);
}
