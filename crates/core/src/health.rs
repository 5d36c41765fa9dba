// SPDX-License-Identifier: MIT

//! Per-drone circuit breaker state.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    Ok,
    ServiceDown,
    Overloaded,
    DiskFull,
    Unreachable,
    Timeout,
    Error,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProbeChecks {
    #[serde(default)]
    pub proc_count: Option<u32>,
    #[serde(default)]
    pub load_1m: Option<f64>,
    #[serde(default)]
    pub disk_percent: Option<f64>,
    #[serde(default)]
    pub emerge_count: Option<u32>,
    #[serde(default)]
    pub uptime_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    pub status: ProbeStatus,
    pub checks: ProbeChecks,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DroneHealth {
    #[serde(default)]
    pub build_failure_count: u32,
    #[serde(default)]
    pub last_failure_secs: Option<i64>,
    #[serde(default)]
    pub rebooted: bool,
    #[serde(default)]
    pub grounded_until_secs: Option<i64>,
    #[serde(default)]
    pub upload_failure_count: u32,
    #[serde(default)]
    pub last_upload_failure_secs: Option<i64>,
    #[serde(default)]
    pub last_probe_result: Option<ProbeResult>,
}
