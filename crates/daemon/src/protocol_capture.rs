// SPDX-License-Identifier: MIT

//! Protocol-log capture middleware.
//!
//! Buffers request/response bodies so they can be recorded, truncated, and
//! handed to [`sw_store::ProtocolLog::try_push`], which never blocks and
//! silently drops entries once its bounded queue is full.

use std::net::SocketAddr;
use std::time::Instant;

use axum::body::{to_bytes, Body};
use axum::extract::{ConnectInfo, State};
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use sw_core::{truncate_body, Clock, MessageType, ProtocolEntry, NodeId, SessionId, REQUEST_BODY_MAX, RESPONSE_BODY_MAX};
use sw_wire::{classify_message, normalize_path};

use crate::coordinator::AppState;

const MAX_BUFFERED_BODY: usize = 1024 * 1024;

pub async fn capture(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());
    let query = request.uri().query().unwrap_or("").to_string();
    let message_type = classify_message(&method, &path);

    let (parts, body) = request.into_parts();
    let request_bytes = to_bytes(body, MAX_BUFFERED_BODY).await.unwrap_or_default();
    let request_summary = String::from_utf8_lossy(&request_bytes).into_owned();
    let rebuilt = Request::from_parts(parts, Body::from(request_bytes));

    let response = next.run(rebuilt).await;
    let status_code = response.status().as_u16();

    let (parts, body) = response.into_parts();
    let response_bytes = to_bytes(body, MAX_BUFFERED_BODY).await.unwrap_or_default();
    let content_length = response_bytes.len() as u64;
    let response_summary = String::from_utf8_lossy(&response_bytes).into_owned();

    if message_type.is_loggable() {
        let now = state.clock.now_secs();
        let id = state.store.next_protocol_id();
        let mut fields = extract_fields(message_type, &path, &query, &request_summary, &response_summary);
        if fields.resolved_node_name.is_none() {
            if let Some(drone_id) = &fields.drone_id {
                fields.resolved_node_name = state.store.get_node(drone_id).map(|n| n.name);
            }
        }
        let entry = ProtocolEntry {
            id,
            timestamp_secs: now,
            source_address: addr.ip().to_string(),
            resolved_node_name: fields.resolved_node_name,
            method,
            path,
            message_type,
            package: fields.package,
            drone_id: fields.drone_id,
            session_id: fields.session_id,
            status_code,
            request_summary: Some(truncate_body(&request_summary, 256)),
            response_summary: Some(truncate_body(&response_summary, 256)),
            request_body: Some(truncate_body(&request_summary, REQUEST_BODY_MAX)),
            response_body: Some(truncate_body(&response_summary, RESPONSE_BODY_MAX)),
            latency_ms: start.elapsed().as_millis() as u64,
            content_length,
        };
        state.protocol.try_push(entry);
    }

    Response::from_parts(parts, Body::from(response_bytes))
}

#[derive(Default)]
struct CapturedFields {
    resolved_node_name: Option<String>,
    package: Option<String>,
    drone_id: Option<NodeId>,
    session_id: Option<SessionId>,
}

/// Pulls `drone_id`/`package`/`session_id`/the resolved node name out of the
/// already-buffered request/response JSON, per `message_type`. Every route's
/// field names are hand-matched here rather than deserialized through the
/// route's own DTO, since a malformed body must never prevent the entry
/// from being logged.
fn extract_fields(message_type: MessageType, path: &str, query: &str, request_summary: &str, response_summary: &str) -> CapturedFields {
    let request_json: Option<serde_json::Value> = serde_json::from_str(request_summary).ok();
    let response_json: Option<serde_json::Value> = serde_json::from_str(response_summary).ok();

    let str_field = |value: &Option<serde_json::Value>, key: &str| -> Option<String> {
        value.as_ref()?.get(key)?.as_str().map(str::to_string)
    };

    match message_type {
        MessageType::Register => CapturedFields {
            drone_id: str_field(&request_json, "id").map(NodeId::from_string),
            resolved_node_name: str_field(&request_json, "name"),
            ..Default::default()
        },
        MessageType::Complete => CapturedFields {
            drone_id: str_field(&request_json, "id").map(NodeId::from_string),
            package: str_field(&request_json, "package"),
            ..Default::default()
        },
        MessageType::Control => CapturedFields { drone_id: str_field(&request_json, "drone_id").map(NodeId::from_string), ..Default::default() },
        MessageType::WorkRequest => CapturedFields {
            drone_id: query_param(query, "id").map(NodeId::from_string),
            package: response_json.as_ref().and_then(|v| v.get("package")).and_then(|v| v.as_str()).map(str::to_string),
            ..Default::default()
        },
        MessageType::Queue => CapturedFields { session_id: str_field(&response_json, "session_id").map(SessionId::from_string), ..Default::default() },
        MessageType::NodePause | MessageType::NodeResume | MessageType::NodeDelete => CapturedFields {
            drone_id: node_id_from_path(path).map(NodeId::from_string),
            resolved_node_name: str_field(&response_json, "name"),
            ..Default::default()
        },
        MessageType::HistoryQuery => CapturedFields { session_id: query_param(query, "session").map(SessionId::from_string), ..Default::default() },
        _ => CapturedFields::default(),
    }
}

fn query_param(query: &str, key: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == key).then(|| urlencoding_decode(v))
    })
}

/// `/api/v1/nodes/<id>/pause|resume` and `/api/v1/nodes/<id>` (delete).
fn node_id_from_path(path: &str) -> Option<String> {
    let rest = path.strip_prefix("/api/v1/nodes/")?;
    let id = rest.strip_suffix("/pause").or_else(|| rest.strip_suffix("/resume")).unwrap_or(rest);
    (!id.is_empty() && !id.contains('/')).then(|| id.to_string())
}

/// Minimal `application/x-www-form-urlencoded` value decoding for the one
/// query parameter shape this middleware inspects; axum's own extractors do
/// the full job for handlers, this is only for protocol-log attribution.
fn urlencoding_decode(value: &str) -> String {
    value.replace('+', " ")
}

#[cfg(test)]
#[path = "protocol_capture_tests.rs"]
mod tests;
