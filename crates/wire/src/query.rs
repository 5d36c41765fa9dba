// SPDX-License-Identifier: MIT

//! Query-string parameter shapes for the control-plane `GET` endpoints.
//! These deserialize directly from the request's query string (e.g. via
//! `axum::extract::Query` in `sw-daemon`); every field is optional so a bare
//! `GET` with no parameters is always valid.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodesQuery {
    #[serde(default)]
    pub all: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkQuery {
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub session: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventsQuery {
    #[serde(default)]
    pub since: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProtocolQuery {
    #[serde(default)]
    pub since: Option<u64>,
    #[serde(rename = "type", default)]
    pub message_type: Option<String>,
    #[serde(default)]
    pub drone: Option<String>,
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub min_latency: Option<f64>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProtocolDetailQuery {
    pub id: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProtocolStatsQuery {
    #[serde(default)]
    pub since: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProtocolDensityQuery {
    pub start: i64,
    pub end: i64,
    #[serde(default = "default_buckets")]
    pub buckets: u32,
}

fn default_buckets() -> u32 {
    100
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProtocolSnapshotQuery {
    pub at: i64,
}
