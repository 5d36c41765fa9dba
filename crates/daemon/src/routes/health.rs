// SPDX-License-Identifier: MIT

//! `GET /api/v1/health` and `GET /api/v1/orchestrator`.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use sw_wire::{HealthResponse, OrchestratorResponse};

use crate::coordinator::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/orchestrator", get(orchestrator))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: if state.is_shutting_down() { "draining".to_string() } else { "ok".to_string() },
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_s: state.uptime_secs(),
    })
}

/// Drones resolve the coordinator's own address through this endpoint
/// rather than a hardcoded host:port, kept for wire compatibility with the
/// original gateway/orchestrator split (see [`sw_wire::NodesResponse`]).
async fn orchestrator(State(state): State<AppState>) -> Json<OrchestratorResponse> {
    let config = state.config.lock().await;
    Json(OrchestratorResponse {
        ip: "0.0.0.0".to_string(),
        name: "swarmd".to_string(),
        port: config.control_plane_port,
    })
}
