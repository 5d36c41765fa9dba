// SPDX-License-Identifier: MIT

//! Payload (drone-deployable artifact) registry types.

use serde::{Deserialize, Serialize};

use crate::node::NodeId;

/// A blob small enough to store inline; larger content is kept on disk and
/// referenced by path. 1 MiB threshold.
pub const INLINE_MAX_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayloadContent {
    Inline(Vec<u8>),
    Path(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadVersion {
    pub payload_type: String,
    pub version: String,
    pub hash: String,
    pub content: PayloadContent,
    pub created_at_secs: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DronePayloadStatus {
    Deploying,
    Deployed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DronePayload {
    pub drone_id: NodeId,
    pub payload_type: String,
    pub version: String,
    pub hash: String,
    pub status: DronePayloadStatus,
    pub updated_at_secs: i64,
}
