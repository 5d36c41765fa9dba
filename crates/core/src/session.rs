// SPDX-License-Identifier: MIT

//! Build campaign sessions.

use serde::{Deserialize, Serialize};

use crate::define_id;

define_id! {
    pub struct SessionId("sess");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
}

#[derive(Debug, Clone, Default, Copy, Serialize, Deserialize)]
pub struct SessionTotals {
    pub needed: u64,
    pub delegated: u64,
    pub received: u64,
    pub blocked: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub name: String,
    pub status: SessionStatus,
    pub started_at_secs: i64,
    pub completed_at_secs: Option<i64>,
    #[serde(default)]
    pub totals: SessionTotals,
}
