// SPDX-License-Identifier: MIT

//! Materialized state rebuilt from WAL replay.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sw_core::{
    BuildHistoryRow, ConfigEntry, DroneHealth, Node, NodeId, PayloadVersion, QueueEntry,
    QueueEntryId, Release, ReleaseId, Session, SessionId,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsRow {
    pub id: u64,
    pub recorded_at_secs: i64,
    pub drone_id: Option<NodeId>,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DronePayloadRow {
    pub drone_id: NodeId,
    pub payload_type: String,
    pub version: String,
    pub hash: String,
    pub status: sw_core::DronePayloadStatus,
    pub updated_at_secs: i64,
}

/// All durable state, kept fully in memory and snapshotted/replayed via the WAL.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MaterializedState {
    pub nodes: HashMap<NodeId, Node>,
    #[serde(default)]
    pub node_by_name: HashMap<String, NodeId>,

    pub queue: HashMap<QueueEntryId, QueueEntry>,
    #[serde(default)]
    pub next_seq: u64,

    pub sessions: HashMap<SessionId, Session>,
    #[serde(default)]
    pub active_session_id: Option<SessionId>,

    #[serde(default)]
    pub build_history: Vec<BuildHistoryRow>,
    #[serde(default)]
    pub next_history_id: u64,

    #[serde(default)]
    pub drone_health: HashMap<NodeId, DroneHealth>,

    #[serde(default)]
    pub config: HashMap<String, ConfigEntry>,

    #[serde(default)]
    pub metrics: Vec<MetricsRow>,
    #[serde(default)]
    pub next_metrics_id: u64,

    #[serde(default)]
    pub releases: HashMap<ReleaseId, Release>,

    #[serde(default)]
    pub payload_versions: Vec<PayloadVersion>,
    #[serde(default)]
    pub drone_payloads: HashMap<(NodeId, String), DronePayloadRow>,

    /// Next event id. Event rows themselves live in `sw_store::events`'s
    /// own persisted log, kept separate from this snapshot for size reasons,
    /// but the id counter is serializable state so it survives restarts.
    #[serde(default)]
    pub next_event_id: u64,
    #[serde(default)]
    pub next_protocol_id: u64,
}
