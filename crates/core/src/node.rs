// SPDX-License-Identifier: MIT

//! Node (drone/sweeper) identity and attributes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::define_id;

define_id! {
    /// Stable identity of a build worker, unique across restarts.
    pub struct NodeId("node");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Drone,
    Sweeper,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Online,
    Offline,
}

/// Free-form capability map with the one field every scheduler decision
/// depends on (`portage_content_timestamp`) promoted to a typed field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Capabilities {
    #[serde(default)]
    pub portage_content_timestamp: Option<String>,
    #[serde(default)]
    pub allow_auto_reboot: Option<bool>,
    #[serde(default)]
    pub drone_type: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    #[serde(default)]
    pub cpu_percent: Option<f64>,
    #[serde(default)]
    pub mem_percent: Option<f64>,
    #[serde(default)]
    pub load_1m: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub secondary_address: Option<String>,
    pub kind: NodeKind,
    pub cores: Option<u32>,
    pub ram_mb: Option<u64>,
    #[serde(default)]
    pub capabilities: Capabilities,
    #[serde(default)]
    pub metrics: MetricsSnapshot,
    #[serde(default)]
    pub current_task: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    pub last_seen_secs: i64,
    pub status: NodeStatus,
    #[serde(default)]
    pub paused: bool,
}

impl Node {
    pub fn is_sweeper(&self, sweeper_prefix: &str) -> bool {
        matches!(self.kind, NodeKind::Sweeper)
            || self.name.to_ascii_lowercase().starts_with(&sweeper_prefix.to_ascii_lowercase())
    }
}

/// Registration payload from a drone's `POST /register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRegistration {
    pub id: NodeId,
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub secondary_address: Option<String>,
    #[serde(default)]
    pub kind: Option<NodeKind>,
    #[serde(default)]
    pub cores: Option<u32>,
    #[serde(default)]
    pub ram_mb: Option<u64>,
    #[serde(default)]
    pub capabilities: Capabilities,
    #[serde(default)]
    pub metrics: MetricsSnapshot,
    #[serde(default)]
    pub current_task: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// Ordered map so capability/metric serialization is deterministic in tests.
pub type OrderedMap<V> = BTreeMap<String, V>;
