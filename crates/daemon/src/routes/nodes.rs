// SPDX-License-Identifier: MIT

//! Node lifecycle: list, register, work assignment, pause/resume/delete.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Path, Query, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};

use sw_core::{EventType, Node, NodeId, NodeStatus};
use sw_engine::WorkOutcome;
use sw_wire::{NodePauseResponse, NodesQuery, NodesResponse, RegisterRequest, RegisterResponse, WorkQuery, WorkResponse};

use crate::coordinator::AppState;
use crate::error::ApiError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/nodes", get(list_nodes))
        .route("/api/v1/register", post(register))
        .route("/api/v1/work", get(work))
        .route("/api/v1/nodes/:id/pause", post(pause))
        .route("/api/v1/nodes/:id/resume", post(resume))
        .route("/api/v1/nodes/:id", delete(remove))
}

async fn list_nodes(State(state): State<AppState>, Query(q): Query<NodesQuery>) -> Json<NodesResponse> {
    let drones = state.store.get_all_nodes(q.all, None);
    Json(NodesResponse { drones, orchestrators: Vec::new() })
}

async fn register(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let was_online = state.store.get_node(&req.id).map(|n| n.status == NodeStatus::Online).unwrap_or(false);
    let now = state.clock.now_secs();
    let address = req.ip.clone().unwrap_or_else(|| addr.ip().to_string());

    let registration = sw_core::NodeRegistration {
        id: req.id,
        name: req.name.clone(),
        address,
        secondary_address: None,
        kind: req.kind,
        cores: req.cores,
        ram_mb: req.ram_mb,
        capabilities: req.capabilities,
        metrics: req.metrics,
        current_task: req.current_task,
        version: req.version,
    };
    state.store.upsert_node(registration, now)?;

    if !was_online {
        let id = state.store.next_event_id();
        state.events.emit(id, EventType::Register, format!("{} online", req.name), serde_json::json!({}), Some(req.id), None, now)?;
    }

    let config = state.config.lock().await;
    let paused = state.store.get_node(&req.id).map(|n| n.paused);
    Ok(Json(RegisterResponse {
        status: "ok".to_string(),
        orchestrator: "swarmd".to_string(),
        orchestrator_port: config.control_plane_port,
        orchestrator_name: "swarmd".to_string(),
        paused,
    }))
}

async fn work(State(state): State<AppState>, Query(q): Query<WorkQuery>) -> Result<Json<WorkResponse>, ApiError> {
    let drone_id = NodeId::from_string(&q.id);
    match state.scheduler.get_work(drone_id)? {
        WorkOutcome::None => Ok(Json(WorkResponse::package(None))),
        WorkOutcome::Package(atom) => Ok(Json(WorkResponse::package(Some(atom)))),
        WorkOutcome::Directive { action, expected_timestamp } => {
            let mut extra = serde_json::Map::new();
            extra.insert("expected_timestamp".to_string(), serde_json::json!(expected_timestamp));
            Ok(Json(WorkResponse::Directive { action, extra }))
        }
    }
}

fn resolve(state: &AppState, id_or_name: &str) -> Option<Node> {
    let id = NodeId::from_string(id_or_name);
    state.store.get_node(&id).or_else(|| state.store.get_node_by_name(id_or_name))
}

async fn pause(State(state): State<AppState>, Path(id_or_name): Path<String>) -> Result<Json<NodePauseResponse>, ApiError> {
    let node = resolve(&state, &id_or_name).ok_or_else(|| ApiError::NotFound(id_or_name.clone()))?;
    state.store.set_node_paused(node.id, true)?;
    Ok(Json(NodePauseResponse { status: "paused".to_string(), name: node.name }))
}

async fn resume(State(state): State<AppState>, Path(id_or_name): Path<String>) -> Result<Json<NodePauseResponse>, ApiError> {
    let node = resolve(&state, &id_or_name).ok_or_else(|| ApiError::NotFound(id_or_name.clone()))?;
    state.store.set_node_paused(node.id, false)?;
    Ok(Json(NodePauseResponse { status: "resumed".to_string(), name: node.name }))
}

async fn remove(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<NodePauseResponse>, ApiError> {
    let node = resolve(&state, &id).ok_or_else(|| ApiError::NotFound(id.clone()))?;
    state.store.remove_node(node.id)?;
    Ok(Json(NodePauseResponse { status: "removed".to_string(), name: node.name }))
}
