// SPDX-License-Identifier: MIT

//! Protocol-log entry schema.
//!
//! Classification of `(method, path)` into a [`MessageType`] lives in
//! `sw-wire`, which owns the HTTP route table; this module only defines the
//! persisted shape so both `sw-wire` (producer) and `sw-store` (sink) agree
//! on it without a dependency cycle.

use serde::{Deserialize, Serialize};

use crate::node::NodeId;
use crate::session::SessionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    WorkRequest,
    Register,
    Complete,
    StatusQuery,
    HistoryQuery,
    NodeList,
    EventsQuery,
    Queue,
    Control,
    HealthCheck,
    Discovery,
    NodePause,
    NodeResume,
    NodeDelete,
    ProtocolQuery,
    Provisioning,
    Unknown,
}

impl MessageType {
    /// Entries of this type are never logged, to prevent observer-effect
    /// recursion.
    pub fn is_loggable(self) -> bool {
        !matches!(self, MessageType::ProtocolQuery)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolEntry {
    pub id: u64,
    pub timestamp_secs: i64,
    pub source_address: String,
    #[serde(default)]
    pub resolved_node_name: Option<String>,
    pub method: String,
    pub path: String,
    pub message_type: MessageType,
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub drone_id: Option<NodeId>,
    #[serde(default)]
    pub session_id: Option<SessionId>,
    pub status_code: u16,
    #[serde(default)]
    pub request_summary: Option<String>,
    #[serde(default)]
    pub response_summary: Option<String>,
    /// Truncated to 4096 bytes.
    #[serde(default)]
    pub request_body: Option<String>,
    /// Truncated to 8192 bytes.
    #[serde(default)]
    pub response_body: Option<String>,
    pub latency_ms: u64,
    pub content_length: u64,
}

pub const REQUEST_BODY_MAX: usize = 4096;
pub const RESPONSE_BODY_MAX: usize = 8192;

/// Truncate a UTF-8 string to at most `max` bytes, respecting char boundaries.
pub fn truncate_body(body: &str, max: usize) -> String {
    if body.len() <= max {
        return body.to_string();
    }
    let mut end = max;
    while end > 0 && !body.is_char_boundary(end) {
        end -= 1;
    }
    body[..end].to_string()
}
