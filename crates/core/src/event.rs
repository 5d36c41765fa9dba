// SPDX-License-Identifier: MIT

//! Activity feed events.

use serde::{Deserialize, Serialize};

use crate::node::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Register,
    Assign,
    Rebalance,
    Complete,
    Return,
    Fail,
    Reclaim,
    Unblock,
    Grounded,
    Heal,
    Alert,
    SessionCompleted,
    ReleasePromoted,
    ReleaseArchived,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    pub timestamp_secs: i64,
    pub event_type: EventType,
    pub message: String,
    #[serde(default)]
    pub detail: serde_json::Value,
    #[serde(default)]
    pub drone_id: Option<NodeId>,
    #[serde(default)]
    pub package: Option<String>,
}
