// SPDX-License-Identifier: MIT

//! Versioned artifact snapshots.

use serde::{Deserialize, Serialize};

use crate::define_id;

define_id! {
    pub struct ReleaseId("rel-");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseStatus {
    Staging,
    Active,
    Archived,
    Deleted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    pub id: ReleaseId,
    pub version: String,
    pub name: Option<String>,
    pub notes: Option<String>,
    pub status: ReleaseStatus,
    pub package_count: u64,
    pub size_mb: f64,
    pub path: String,
    pub created_at_secs: i64,
    pub created_by: String,
    #[serde(default)]
    pub promoted_at_secs: Option<i64>,
    #[serde(default)]
    pub archived_at_secs: Option<i64>,
}

/// On-disk manifest written alongside each release directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseManifest {
    pub version: String,
    pub name: Option<String>,
    pub package_count: u64,
    pub size_mb: f64,
    pub created_at_secs: i64,
    pub created_by: String,
    pub notes: Option<String>,
}

/// Result of comparing two releases' package contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReleaseDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub changed_version: Vec<(String, String, String)>,
    pub unchanged_count: u64,
}
