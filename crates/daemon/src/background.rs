// SPDX-License-Identifier: MIT

//! The five background tickers: metrics recording, maintenance
//! (stale-session reclaim, WAL compaction), session monitoring,
//! protocol-log pruning, and the self-heal loop.

use std::time::Duration;

use sw_core::{Clock, EventType};

use crate::coordinator::AppState;

pub fn spawn_all(state: AppState) {
    tokio::spawn(metrics_recorder(state.clone()));
    tokio::spawn(maintenance_loop(state.clone()));
    tokio::spawn(session_monitor(state.clone()));
    tokio::spawn(protocol_prune_loop(state.clone()));
    tokio::spawn(self_heal_loop(state));
}

/// Every 15s: per-drone + system-wide metrics snapshot. Every ~100 ticks
/// (~25 min) prune rows older than 24h.
async fn metrics_recorder(state: AppState) {
    let mut interval = tokio::time::interval(Duration::from_secs(15));
    let mut ticks = 0u64;
    loop {
        interval.tick().await;
        if state.is_shutting_down() {
            return;
        }
        let now = state.clock.now_secs();
        for node in state.store.get_all_nodes(false, None) {
            let payload = serde_json::json!({ "metrics": node.metrics, "status": node.status });
            if let Err(err) = state.store.log_metrics(Some(node.id), payload, now) {
                tracing::warn!(error = %err, drone = %node.id, "failed to log drone metrics");
            }
        }
        let system = serde_json::json!({ "online_drones": state.store.get_all_nodes(false, None).len() });
        if let Err(err) = state.store.log_metrics(None, system, now) {
            tracing::warn!(error = %err, "failed to log system metrics");
        }

        ticks += 1;
        if ticks % 100 == 0 {
            if let Err(err) = state.store.prune_old_metrics(24 * 3600, now) {
                tracing::warn!(error = %err, "failed to prune metrics");
            }
        }
    }
}

/// Every 15s: node liveness sweep, offline-work reclamation, blocked-entry
/// aging, and a WAL-size check that triggers compaction once the log grows
/// past `wal_compact_threshold_bytes`.
async fn maintenance_loop(state: AppState) {
    let mut interval = tokio::time::interval(Duration::from_secs(15));
    loop {
        interval.tick().await;
        if state.is_shutting_down() {
            return;
        }
        let config = state.config.lock().await;
        let node_timeout_secs = config.node_timeout_secs;
        let stale_timeout_hours = config.stale_timeout_hours;
        let failure_age_minutes = config.failure_age_minutes;
        let wal_compact_threshold_bytes = config.wal_compact_threshold_bytes;
        drop(config);

        let now = state.clock.now_secs();
        if let Err(err) = state.store.update_node_status(node_timeout_secs, now) {
            tracing::warn!(error = %err, "update_node_status failed");
        }
        if let Err(err) = state.scheduler.reclaim_offline_work(stale_timeout_hours) {
            tracing::warn!(error = %err, "reclaim_offline_work failed");
        }
        if let Err(err) = state.scheduler.auto_age_blocked(failure_age_minutes) {
            tracing::warn!(error = %err, "auto_age_blocked failed");
        }

        match state.store.wal_size_bytes() {
            Ok(size) if size >= wal_compact_threshold_bytes => {
                if let Err(err) = state.store.checkpoint() {
                    tracing::warn!(error = %err, "WAL checkpoint failed");
                } else {
                    tracing::info!(size, threshold = wal_compact_threshold_bytes, "compacted WAL");
                }
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(error = %err, "failed to read WAL size"),
        }
    }
}

/// Every 30s: close out an active session once its queue has drained.
async fn session_monitor(state: AppState) {
    let mut interval = tokio::time::interval(Duration::from_secs(30));
    loop {
        interval.tick().await;
        if state.is_shutting_down() {
            return;
        }
        let Some(session) = state.store.get_active_session() else { continue };
        let totals = state.store.queue_counts(Some(session.id));
        let settled = totals.received > 0 || totals.blocked > 0;
        if totals.needed == 0 && totals.delegated == 0 && settled {
            let now = state.clock.now_secs();
            if let Err(err) = state.store.complete_session(session.id, now) {
                tracing::warn!(error = %err, session = %session.id, "failed to complete session");
                continue;
            }
            let id = state.store.next_event_id();
            let _ = state.events.emit(id, EventType::SessionCompleted, format!("session {} completed", session.name), serde_json::json!({}), None, None, now);
        }
    }
}

/// Every 5 min: flush then prune the protocol log; also flushes every 500ms
/// so the write-behind queue never holds entries longer than that and a
/// protocol-log write is never on the hot path of a request.
async fn protocol_prune_loop(state: AppState) {
    let mut flush_interval = tokio::time::interval(Duration::from_millis(500));
    let mut prune_at = state.clock.now_secs() + 300;
    loop {
        flush_interval.tick().await;
        if state.is_shutting_down() {
            let _ = state.protocol.flush();
            return;
        }
        if let Err(err) = state.protocol.flush() {
            tracing::warn!(error = %err, "protocol log flush failed");
        }
        let now = state.clock.now_secs();
        if now >= prune_at {
            let cutoff = now - 24 * 3600;
            let pruned = state.protocol.prune_older_than(cutoff);
            if pruned > 0 {
                tracing::debug!(pruned, "pruned old protocol log entries");
            }
            prune_at = now + 300;
        }
    }
}

/// Every 30s: drive the self-heal escalation ladder.
async fn self_heal_loop(state: AppState) {
    let mut interval = tokio::time::interval(Duration::from_secs(30));
    loop {
        interval.tick().await;
        if state.is_shutting_down() {
            return;
        }
        if let Err(err) = state.selfheal.tick().await {
            tracing::warn!(error = %err, "self-heal tick failed");
        }
    }
}
