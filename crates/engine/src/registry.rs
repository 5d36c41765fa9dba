// SPDX-License-Identifier: MIT

//! Payload registry: tracks `(type, version, hash)` for each class of
//! drone-deployable artifact and per-drone deployment status. Pushing
//! content to a drone is out of scope here — this module owns only the
//! registry and drift detection.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use sw_core::{Clock, DronePayloadStatus, NodeId, PayloadContent, PayloadVersion, SystemClock, INLINE_MAX_BYTES};
use sw_store::{DronePayloadRow, Store};

use crate::error::{EngineError, EngineResult};

pub fn compute_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// Result of comparing a drone's reported hash against the registry's
/// record of what it should be running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriftCheck {
    Matches,
    Mismatch { expected: String, observed: String },
    NoRecord,
}

pub struct PayloadRegistry<C: Clock = SystemClock> {
    store: Arc<Store>,
    payload_dir: PathBuf,
    clock: C,
}

impl<C: Clock> PayloadRegistry<C> {
    pub fn new(store: Arc<Store>, payload_dir: PathBuf, clock: C) -> Self {
        Self { store, payload_dir, clock }
    }

    /// Registers a new version. Idempotent when the same `(type, version)`
    /// is re-registered with identical content; conflicts when the content
    /// differs.
    pub fn register_version(&self, payload_type: &str, version: &str, content: &[u8]) -> EngineResult<PayloadVersion> {
        let hash = compute_hash(content);
        if let Some(existing) = self.find_version(payload_type, version) {
            if existing.hash == hash {
                return Ok(existing);
            }
            return Err(EngineError::PayloadConflict(payload_type.to_string(), version.to_string()));
        }

        let stored = if content.len() <= INLINE_MAX_BYTES {
            PayloadContent::Inline(content.to_vec())
        } else {
            fs::create_dir_all(&self.payload_dir)?;
            let path = self.payload_dir.join(format!("{payload_type}-{version}"));
            fs::write(&path, content)?;
            PayloadContent::Path(path.to_string_lossy().into_owned())
        };

        let pv = PayloadVersion {
            payload_type: payload_type.to_string(),
            version: version.to_string(),
            hash,
            content: stored,
            created_at_secs: self.clock.now_secs(),
        };
        self.store.append_payload_version(pv.clone())?;
        Ok(pv)
    }

    /// Reads back a version's content, following an on-disk path when the
    /// payload was too large to store inline.
    pub fn get_payload_content(&self, payload_type: &str, version: &str) -> EngineResult<Option<Vec<u8>>> {
        let Some(pv) = self.find_version(payload_type, version) else { return Ok(None) };
        match pv.content {
            PayloadContent::Inline(bytes) => Ok(Some(bytes)),
            PayloadContent::Path(path) => {
                if std::path::Path::new(&path).exists() {
                    Ok(Some(fs::read(path)?))
                } else {
                    Ok(None)
                }
            }
        }
    }

    pub fn latest_version(&self, payload_type: &str) -> Option<PayloadVersion> {
        self.store.latest_payload_version(payload_type)
    }

    fn find_version(&self, payload_type: &str, version: &str) -> Option<PayloadVersion> {
        self.store
            .list_payload_versions(payload_type)
            .into_iter()
            .find(|p| p.version == version)
    }

    /// Records the per-drone deployment state for a payload type
    /// (`deploying` / `deployed` / `failed`).
    pub fn set_drone_status(&self, drone_id: NodeId, payload_type: &str, version: &str, hash: &str, status: DronePayloadStatus) -> EngineResult<()> {
        self.store.upsert_drone_payload(DronePayloadRow {
            drone_id,
            payload_type: payload_type.to_string(),
            version: version.to_string(),
            hash: hash.to_string(),
            status,
            updated_at_secs: self.clock.now_secs(),
        })?;
        Ok(())
    }

    /// Compares a drone's actually-observed hash (e.g. from `sha256sum`
    /// over SSH) against the registry's record for that drone/type.
    pub fn check_drift(&self, drone_id: &NodeId, payload_type: &str, observed_hash: &str) -> DriftCheck {
        match self.store.get_drone_payload(drone_id, payload_type) {
            Some(row) if row.hash == observed_hash => DriftCheck::Matches,
            Some(row) => DriftCheck::Mismatch { expected: row.hash, observed: observed_hash.to_string() },
            None => DriftCheck::NoRecord,
        }
    }

    /// Drones whose recorded version for `payload_type` is behind the
    /// latest registered version.
    pub fn outdated_drones(&self, payload_type: &str, known_drones: &[NodeId]) -> Vec<NodeId> {
        let Some(latest) = self.latest_version(payload_type) else { return Vec::new() };
        known_drones
            .iter()
            .filter(|id| {
                self.store
                    .get_drone_payload(id, payload_type)
                    .map(|row| row.version != latest.version)
                    .unwrap_or(true)
            })
            .copied()
            .collect()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
