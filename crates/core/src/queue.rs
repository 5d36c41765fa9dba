// SPDX-License-Identifier: MIT

//! Queue entry state machine.

use serde::{Deserialize, Serialize};

use crate::define_id;
use crate::node::NodeId;
use crate::session::SessionId;

define_id! {
    /// Monotonic-feeling opaque id for a queue entry; ordering for
    /// "oldest-first" scans is by [`QueueEntry::seq`], not by this id.
    pub struct QueueEntryId("qentry");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Needed,
    Delegated,
    Received,
    Blocked,
    Failed,
}

impl QueueStatus {
    /// "Active": needed or delegated — the states that participate in
    /// the (atom, session) uniqueness invariant.
    pub fn is_active(self) -> bool {
        matches!(self, QueueStatus::Needed | QueueStatus::Delegated)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: QueueEntryId,
    /// Monotonically increasing insertion sequence, used for oldest-first scans.
    pub seq: u64,
    pub atom: String,
    pub status: QueueStatus,
    pub owner: Option<NodeId>,
    pub assigned_at_secs: Option<i64>,
    pub completed_at_secs: Option<i64>,
    #[serde(default)]
    pub failure_count: u32,
    #[serde(default)]
    pub last_error: Option<String>,
    #[serde(default)]
    pub session_id: Option<SessionId>,
}

impl QueueEntry {
    pub fn new(seq: u64, atom: impl Into<String>, session_id: Option<SessionId>) -> Self {
        Self {
            id: QueueEntryId::new(),
            seq,
            atom: atom.into(),
            status: QueueStatus::Needed,
            owner: None,
            assigned_at_secs: None,
            completed_at_secs: None,
            failure_count: 0,
            last_error: None,
            session_id,
        }
    }

    /// Invariant: delegated implies owner+assigned_at set; needed implies
    /// owner unset.
    pub fn invariant_holds(&self) -> bool {
        match self.status {
            QueueStatus::Delegated => self.owner.is_some() && self.assigned_at_secs.is_some(),
            QueueStatus::Needed => self.owner.is_none(),
            _ => true,
        }
    }
}

/// Outcome reported by a drone in `POST /complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    Success,
    Returned,
    Failed,
    MissingBinary,
    UploadFailed,
}

impl CompletionStatus {
    pub fn is_success(self) -> bool {
        matches!(self, CompletionStatus::Success)
    }

    /// Infrastructure failures excluded from per-package failure accounting.
    pub fn is_infrastructure_failure(self) -> bool {
        matches!(self, CompletionStatus::UploadFailed)
    }
}

/// Immutable completion record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildHistoryRow {
    pub id: u64,
    pub atom: String,
    pub drone_id: NodeId,
    pub status: CompletionStatus,
    pub duration_s: Option<f64>,
    pub error: Option<String>,
    pub recorded_at_secs: i64,
}
