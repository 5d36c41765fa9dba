// SPDX-License-Identifier: MIT

//! JSON response bodies for the control-plane HTTP endpoints.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sw_core::{
    BuildHistoryRow, DroneHealth, Event, MessageType, Node, NodeId, ProtocolEntry, Session,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_s: f64,
}

/// `orchestrators` is always empty: this control plane tracks only drones
/// and sweepers, kept as a field for wire compatibility with deployments
/// that still expect a gateway/orchestrator split in the response shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodesResponse {
    pub drones: Vec<Node>,
    pub orchestrators: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorResponse {
    pub ip: String,
    pub name: String,
    pub port: u16,
}

/// `GET /api/v1/work` returns either a package assignment (`{package:
/// atom|null}`) or a self-heal directive (`{action: ..., ...}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorkResponse {
    Package {
        package: Option<String>,
    },
    Directive {
        action: String,
        #[serde(flatten)]
        extra: serde_json::Map<String, serde_json::Value>,
    },
}

impl WorkResponse {
    pub fn package(atom: Option<String>) -> Self {
        WorkResponse::Package { package: atom }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DroneStatusEntry {
    pub name: String,
    pub ip: String,
    pub status: String,
    #[serde(default)]
    pub current_task: Option<String>,
    pub capabilities: sw_core::Capabilities,
    pub metrics: sw_core::MetricsSnapshot,
    pub last_seen: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegatedEntry {
    pub drone: Option<NodeId>,
    pub assigned_at: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageLists {
    pub needed: Vec<String>,
    pub delegated: HashMap<String, DelegatedEntry>,
    pub blocked: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildStats {
    pub total: u64,
    pub success: u64,
    pub non_success: u64,
    pub success_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub needed: u64,
    pub delegated: u64,
    pub received: u64,
    pub blocked: u64,
    pub failed: u64,
    pub total: u64,
    pub paused: bool,
    pub session: Option<Session>,
    pub packages: PackageLists,
    pub drones: HashMap<NodeId, DroneStatusEntry>,
    pub drone_health: HashMap<NodeId, DroneHealth>,
    pub timing: BuildStats,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub history: Vec<BuildHistoryRow>,
    pub stats: BuildStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsResponse {
    pub events: Vec<Event>,
    pub latest_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolQueryResponse {
    pub entries: Vec<ProtocolEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolStatsRow {
    pub msg_type: MessageType,
    pub count: u64,
    pub avg_latency: f64,
    pub max_latency: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolStatsResponse {
    pub total: u64,
    pub by_type: Vec<ProtocolStatsRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolDensityResponse {
    pub density: Vec<u64>,
    pub start: i64,
    pub end: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolSnapshotResponse {
    pub timestamp: i64,
    pub status: serde_json::Value,
    pub nodes: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub status: String,
    pub orchestrator: String,
    pub orchestrator_port: u16,
    pub orchestrator_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteResponse {
    pub status: String,
    pub accepted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueResponse {
    pub status: String,
    pub queued: u64,
    pub session_id: Option<sw_core::SessionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portage_timestamp: Option<String>,
}

/// `POST /api/v1/control` response: `status` plus whatever extra counters
/// the action reports (`unblocked`, `affected`, `reclaimed`, `cleared`,
/// `retried`) — each action builds its own counters rather than sharing
/// one fixed schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlResponse {
    pub status: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ControlResponse {
    pub fn status(status: impl Into<String>) -> Self {
        Self { status: status.into(), extra: Default::default() }
    }

    pub fn with(status: impl Into<String>, key: &str, value: impl Into<serde_json::Value>) -> Self {
        let mut extra = serde_json::Map::new();
        extra.insert(key.to_string(), value.into());
        Self { status: status.into(), extra }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodePauseResponse {
    pub status: String,
    pub name: String,
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
