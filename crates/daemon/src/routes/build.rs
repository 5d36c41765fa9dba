// SPDX-License-Identifier: MIT

//! Build-campaign surface: status, history, events, queue, complete,
//! control.

use std::collections::HashMap;
use std::path::PathBuf;

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};

use sw_core::{CompletionStatus, EventType, SessionId};
use sw_store::CompleteOutcome;
use sw_wire::{
    BuildStats, CompleteRequest, CompleteResponse, ControlAction, ControlRequest, ControlResponse,
    DelegatedEntry, DroneStatusEntry, EventsQuery, EventsResponse, HistoryQuery, HistoryResponse,
    PackageLists, QueueRequest, QueueResponse, StatusResponse,
};

use crate::coordinator::AppState;
use crate::error::ApiError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/status", get(status))
        .route("/api/v1/history", get(history))
        .route("/api/v1/events", get(events))
        .route("/api/v1/queue", post(queue))
        .route("/api/v1/complete", post(complete))
        .route("/api/v1/control", post(control))
}

fn build_stats(history: &[sw_core::BuildHistoryRow]) -> BuildStats {
    let total = history.len() as u64;
    let success = history.iter().filter(|h| h.status.is_success()).count() as u64;
    BuildStats {
        total,
        success,
        non_success: total - success,
        success_rate: if total == 0 { 0.0 } else { success as f64 / total as f64 },
    }
}

async fn status(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    let session = state.store.get_active_session();
    let session_id = session.as_ref().map(|s| s.id);
    let totals = state.store.queue_counts(session_id);

    let mut needed = Vec::new();
    let mut delegated = HashMap::new();
    for entry in state.store.get_needed_packages(usize::MAX, session_id) {
        needed.push(entry.atom);
    }
    for entry in state.store.get_delegated_packages() {
        delegated.insert(entry.atom.clone(), DelegatedEntry { drone: entry.owner, assigned_at: entry.assigned_at_secs });
    }
    let blocked: Vec<String> = state.store.get_blocked_packages(usize::MAX).into_iter().map(|e| e.atom).collect();

    let mut drones = HashMap::new();
    let mut drone_health = HashMap::new();
    for node in state.store.get_all_nodes(true, None) {
        let current_task = state
            .store
            .get_delegated_packages()
            .into_iter()
            .find(|e| e.owner == Some(node.id))
            .map(|e| e.atom);
        drone_health.insert(node.id, state.store.get_drone_health(&node.id));
        drones.insert(
            node.id,
            DroneStatusEntry {
                name: node.name.clone(),
                ip: node.address.clone(),
                status: format!("{:?}", node.status).to_lowercase(),
                current_task,
                capabilities: node.capabilities.clone(),
                metrics: node.metrics.clone(),
                last_seen: node.last_seen_secs,
            },
        );
    }

    let history = state.store.get_build_history(usize::MAX, session_id);
    let paused = state.store.get_config("paused").map(|c| c.value.as_bool().unwrap_or(false)).unwrap_or(false);

    Ok(Json(StatusResponse {
        needed: totals.needed,
        delegated: totals.delegated,
        received: totals.received,
        blocked: totals.blocked,
        failed: totals.failed,
        total: totals.needed + totals.delegated + totals.received + totals.blocked + totals.failed,
        paused,
        session,
        packages: PackageLists { needed, delegated, blocked },
        drones,
        drone_health,
        timing: build_stats(&history),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

async fn history(State(state): State<AppState>, Query(q): Query<HistoryQuery>) -> Json<HistoryResponse> {
    let session_id = q.session.map(SessionId::from_string);
    let rows = state.store.get_build_history(q.limit.unwrap_or(200), session_id);
    let stats = build_stats(&rows);
    Json(HistoryResponse { history: rows, stats })
}

async fn events(State(state): State<AppState>, Query(q): Query<EventsQuery>) -> Json<EventsResponse> {
    let (events, latest_id) = state.events.since(q.since.unwrap_or(0));
    Json(EventsResponse { events, latest_id })
}

async fn queue(State(state): State<AppState>, Json(req): Json<QueueRequest>) -> Result<Json<QueueResponse>, ApiError> {
    let now = state.clock.now_secs();
    let session_id = match state.store.get_active_session() {
        Some(s) => s.id,
        None => state.store.start_session("auto", now)?,
    };
    let queued = state.store.queue_packages(&req.packages, Some(session_id), now)?;
    if let Some(ts) = &req.portage_timestamp {
        state.store.set_config("portage_content_timestamp", serde_json::json!(ts), now)?;
    }
    Ok(Json(QueueResponse { status: "ok".to_string(), queued, session_id: Some(session_id), portage_timestamp: req.portage_timestamp }))
}

/// `{STAGING, BINHOST, legacy-staging, legacy-binhost}`.
/// Legacy roots are the pre-release-system flat directories, kept for
/// drones still reporting against an unmigrated binhost.
fn validation_roots(staging: &PathBuf, binhost: &PathBuf) -> Vec<PathBuf> {
    vec![staging.clone(), binhost.clone(), staging.with_file_name("legacy-staging"), binhost.with_file_name("legacy-binhost")]
}

async fn complete(State(state): State<AppState>, Json(req): Json<CompleteRequest>) -> Result<Json<CompleteResponse>, ApiError> {
    let now = state.clock.now_secs();
    let mut status = req.status;

    if status == CompletionStatus::Success && !sw_adapters::is_virtual_atom(&req.package) && !req.package.contains("app-test/dummy-") {
        let config = state.config.lock().await;
        let roots = validation_roots(&config.staging_path, &config.binhost_path);
        let found = sw_adapters::find_valid_artifact(&roots, &req.package).map_err(|e| ApiError::Internal(e.to_string()))?;
        if found.is_none() {
            status = CompletionStatus::MissingBinary;
        }
    }

    let entry_failure_threshold = state.config.lock().await.entry_failure_threshold;
    let outcome = state.store.complete_package(&req.package, req.id, status, req.build_duration_s, req.error_detail.clone(), now, entry_failure_threshold)?;

    if !matches!(outcome, CompleteOutcome::Ignored) {
        let (event_type, message) = match outcome {
            CompleteOutcome::Received => (EventType::Complete, format!("{} completed {}", req.id, req.package)),
            CompleteOutcome::ReturnedToNeeded => (EventType::Return, format!("{} returned {}", req.id, req.package)),
            CompleteOutcome::BlockedAfterFailures => (EventType::Fail, format!("{} blocked after repeated failures", req.package)),
            CompleteOutcome::Ignored => unreachable!(),
        };
        let id = state.store.next_event_id();
        state.events.emit(id, event_type, message, serde_json::json!({ "status": format!("{:?}", status) }), Some(req.id), Some(req.package.clone()), now)?;
    }

    if matches!(status, CompletionStatus::Failed | CompletionStatus::MissingBinary) {
        state.health.record_failure(req.id)?;
    } else if status == CompletionStatus::Success {
        state.health.record_success(req.id)?;
    } else if status == CompletionStatus::UploadFailed {
        state.health.record_upload_failure(req.id)?;
    }

    let accepted = !matches!(outcome, CompleteOutcome::Ignored);
    Ok(Json(CompleteResponse { status: "ok".to_string(), accepted }))
}

async fn control(State(state): State<AppState>, Json(req): Json<ControlRequest>) -> Result<Json<ControlResponse>, ApiError> {
    let now = state.clock.now_secs();
    let response = match req.action {
        ControlAction::Pause => {
            state.store.set_config("paused", serde_json::json!(true), now)?;
            ControlResponse::status("paused")
        }
        ControlAction::Resume => {
            state.store.set_config("paused", serde_json::json!(false), now)?;
            ControlResponse::status("resumed")
        }
        ControlAction::Unblock => {
            let unblocked = state.store.unblock_all()?;
            ControlResponse::with("ok", "unblocked", unblocked)
        }
        ControlAction::Unground => {
            state.store.reset_drone_health(req.drone_id)?;
            ControlResponse::status("ok")
        }
        ControlAction::Reset => {
            let session_id = state.store.get_active_session().map(|s| s.id);
            let affected = state.store.reset_queue(session_id)?;
            ControlResponse::with("reset", "affected", affected)
        }
        ControlAction::Rebalance => {
            let mut reclaimed = 0u64;
            for entry in state.store.get_delegated_packages() {
                if state.store.reclaim_package_by_id(entry.id)? {
                    reclaimed += 1;
                }
            }
            ControlResponse::with("ok", "reclaimed", reclaimed)
        }
        ControlAction::ClearFailures => {
            state.store.unblock_all()?;
            ControlResponse::status("ok")
        }
        ControlAction::RetryFailures => {
            let requeued = state.store.unblock_all()?;
            ControlResponse::with("ok", "requeued", requeued)
        }
    };
    Ok(Json(response))
}
