// SPDX-License-Identifier: MIT

//! Protocol-log query surface for the replay/scrubber UI.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};

use sw_core::MessageType;
use sw_wire::{
    ProtocolDensityQuery, ProtocolDensityResponse, ProtocolDetailQuery, ProtocolQuery,
    ProtocolQueryResponse, ProtocolSnapshotQuery, ProtocolSnapshotResponse, ProtocolStatsQuery,
    ProtocolStatsResponse, ProtocolStatsRow,
};

use crate::coordinator::AppState;
use crate::error::ApiError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/protocol", get(query))
        .route("/api/v1/protocol/detail", get(detail))
        .route("/api/v1/protocol/stats", get(stats))
        .route("/api/v1/protocol/density", get(density))
        .route("/api/v1/protocol/snapshot", get(snapshot))
}

fn parse_message_type(raw: &str) -> Result<MessageType, ApiError> {
    serde_json::from_value(serde_json::json!(raw)).map_err(|_| ApiError::InvalidRequest(format!("unknown protocol message type: {raw}")))
}

async fn query(State(state): State<AppState>, Query(q): Query<ProtocolQuery>) -> Result<Json<ProtocolQueryResponse>, ApiError> {
    let message_type = q.message_type.as_deref().map(parse_message_type).transpose()?;
    let min_latency_ms = q.min_latency.map(|v| v.round() as u64);
    let entries = state.protocol.query(
        q.since.unwrap_or(0),
        message_type,
        q.drone.as_deref(),
        q.package.as_deref(),
        min_latency_ms,
        q.limit.unwrap_or(200).min(2000),
    );
    Ok(Json(ProtocolQueryResponse { entries }))
}

async fn detail(State(state): State<AppState>, Query(q): Query<ProtocolDetailQuery>) -> Result<Json<sw_core::ProtocolEntry>, ApiError> {
    state.protocol.detail(q.id).map(Json).ok_or_else(|| ApiError::NotFound(format!("protocol entry {}", q.id)))
}

async fn stats(State(state): State<AppState>, Query(q): Query<ProtocolStatsQuery>) -> Json<ProtocolStatsResponse> {
    let rows = state.protocol.stats(q.since.unwrap_or(0) as u64);
    let total = rows.iter().map(|(_, count, _)| *count).sum();
    let by_type = rows
        .into_iter()
        .map(|(msg_type, count, avg_latency)| ProtocolStatsRow { msg_type, count, avg_latency, max_latency: 0 })
        .collect();
    Json(ProtocolStatsResponse { total, by_type })
}

async fn density(State(state): State<AppState>, Query(q): Query<ProtocolDensityQuery>) -> Json<ProtocolDensityResponse> {
    let density = state.protocol.activity_density(q.start, q.end, q.buckets as usize);
    Json(ProtocolDensityResponse { density, start: q.start, end: q.end })
}

async fn snapshot(State(state): State<AppState>, Query(q): Query<ProtocolSnapshotQuery>) -> Json<ProtocolSnapshotResponse> {
    let (status, nodes) = state.protocol.state_at_time(q.at);
    Json(ProtocolSnapshotResponse {
        timestamp: q.at,
        status: status.and_then(|s| serde_json::from_str(&s).ok()).unwrap_or(serde_json::Value::Null),
        nodes: nodes.and_then(|s| serde_json::from_str(&s).ok()).unwrap_or(serde_json::Value::Null),
    })
}
