// SPDX-License-Identifier: MIT

//! JSON request bodies for the control-plane `POST` endpoints.

use serde::{Deserialize, Serialize};
use sw_core::{Capabilities, CompletionStatus, MetricsSnapshot, NodeId, NodeKind};

/// Body of `POST /api/v1/register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub id: NodeId,
    pub name: String,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(rename = "type", default)]
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

/// Body of `POST /api/v1/complete`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteRequest {
    pub id: NodeId,
    pub package: String,
    pub status: CompletionStatus,
    #[serde(default)]
    pub build_duration_s: Option<f64>,
    #[serde(default)]
    pub error_detail: Option<String>,
}

/// Body of `POST /api/v1/queue`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueRequest {
    pub packages: Vec<String>,
    #[serde(default)]
    pub portage_timestamp: Option<String>,
}

/// The `action` field of `POST /api/v1/control`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlAction {
    Pause,
    Resume,
    Unblock,
    Unground,
    Reset,
    /// Reclaims all delegated work; accepted under either name.
    #[serde(alias = "optimize")]
    Rebalance,
    ClearFailures,
    RetryFailures,
}

/// Body of `POST /api/v1/control`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlRequest {
    pub action: ControlAction,
    #[serde(default)]
    pub drone_id: Option<NodeId>,
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
