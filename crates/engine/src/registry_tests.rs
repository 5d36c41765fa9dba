// SPDX-License-Identifier: MIT

use super::*;
use sw_core::FakeClock;
use tempfile::tempdir;

fn harness() -> (PayloadRegistry<FakeClock>, Arc<Store>) {
    let dir = tempdir().unwrap();
    let store = Arc::new(Store::open(dir.path().join("swarm.wal")).unwrap());
    let clock = FakeClock::new();
    let registry = PayloadRegistry::new(store.clone(), dir.path().join("payloads"), clock);
    (registry, store)
}

#[test]
fn compute_hash_is_sha256_hex() {
    let hash = compute_hash(b"hello");
    assert_eq!(hash, "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824");
}

#[test]
fn register_version_stores_inline_under_threshold() {
    let (registry, _store) = harness();
    let pv = registry.register_version("drone_binary", "1.0.0", b"#!/bin/sh\necho hi\n").unwrap();
    assert!(matches!(pv.content, sw_core::PayloadContent::Inline(_)));
    assert_eq!(registry.get_payload_content("drone_binary", "1.0.0").unwrap(), Some(b"#!/bin/sh\necho hi\n".to_vec()));
}

#[test]
fn register_version_spills_to_disk_above_threshold() {
    let (registry, _store) = harness();
    let big = vec![7u8; INLINE_MAX_BYTES + 1];
    let pv = registry.register_version("config", "2.0.0", &big).unwrap();
    assert!(matches!(pv.content, sw_core::PayloadContent::Path(_)));
    assert_eq!(registry.get_payload_content("config", "2.0.0").unwrap(), Some(big));
}

#[test]
fn register_version_is_idempotent_for_identical_content() {
    let (registry, _store) = harness();
    let a = registry.register_version("config", "1.0.0", b"same").unwrap();
    let b = registry.register_version("config", "1.0.0", b"same").unwrap();
    assert_eq!(a.hash, b.hash);
}

#[test]
fn register_version_conflicts_on_differing_content() {
    let (registry, _store) = harness();
    registry.register_version("config", "1.0.0", b"one").unwrap();
    let err = registry.register_version("config", "1.0.0", b"two").unwrap_err();
    assert!(matches!(err, EngineError::PayloadConflict(_, _)));
}

#[test]
fn latest_version_picks_most_recently_registered() {
    let (registry, _store) = harness();
    registry.register_version("config", "1.0.0", b"one").unwrap();
    registry.register_version("config", "2.0.0", b"two").unwrap();
    assert_eq!(registry.latest_version("config").unwrap().version, "2.0.0");
}

#[test]
fn check_drift_detects_hash_mismatch() {
    let (registry, _store) = harness();
    let id = NodeId::new();
    registry.set_drone_status(id, "config", "1.0.0", "abc123", sw_core::DronePayloadStatus::Deployed).unwrap();

    assert_eq!(registry.check_drift(&id, "config", "abc123"), DriftCheck::Matches);
    assert_eq!(
        registry.check_drift(&id, "config", "def456"),
        DriftCheck::Mismatch { expected: "abc123".to_string(), observed: "def456".to_string() }
    );
    assert_eq!(registry.check_drift(&NodeId::new(), "config", "abc123"), DriftCheck::NoRecord);
}

#[test]
fn outdated_drones_flags_stale_versions() {
    let (registry, _store) = harness();
    registry.register_version("config", "1.0.0", b"one").unwrap();
    registry.register_version("config", "2.0.0", b"two").unwrap();
    let current = NodeId::new();
    let stale = NodeId::new();
    registry.set_drone_status(current, "config", "2.0.0", "h2", sw_core::DronePayloadStatus::Deployed).unwrap();
    registry.set_drone_status(stale, "config", "1.0.0", "h1", sw_core::DronePayloadStatus::Deployed).unwrap();

    let outdated = registry.outdated_drones("config", &[current, stale]);
    assert_eq!(outdated, vec![stale]);
}
