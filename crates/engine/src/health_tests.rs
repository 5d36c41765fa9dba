// SPDX-License-Identifier: MIT

use super::*;
use std::sync::Arc;
use sw_adapters::fake::FakeSsh;
use sw_core::{FakeClock, NodeId};
use sw_store::{EventLog, Store};
use tempfile::tempdir;

fn setup() -> (Arc<Store>, Arc<EventLog>, FakeClock, HealthMonitor<FakeClock>, tokio::sync::mpsc::UnboundedReceiver<EscalationRequest>) {
    let dir = tempdir().unwrap();
    let store = Arc::new(Store::open(dir.path().join("swarm.wal")).unwrap());
    let events = Arc::new(EventLog::open(dir.path().join("events.log")).unwrap());
    let clock = FakeClock::new();
    let ssh: Arc<dyn SshAdapter> = Arc::new(FakeSsh::new());
    let (tx, rx) = escalation_channel();
    let health = HealthMonitor::new(store.clone(), events.clone(), ssh, tx, HealthConfig::default(), clock.clone());
    (store, events, clock, health, rx)
}

#[test]
fn not_grounded_below_threshold() {
    let (store, _events, _clock, health, _rx) = setup();
    let id = NodeId::new();
    for _ in 0..7 {
        store.record_drone_failure(id, 0).unwrap();
    }
    assert!(!health.check_grounded(id, "d1").unwrap());
}

#[test]
fn grounds_at_threshold_and_requests_escalation() {
    let (store, _events, clock, health, mut rx) = setup();
    let id = NodeId::new();
    for _ in 0..8 {
        store.record_drone_failure(id, clock.now_secs()).unwrap();
    }
    assert!(health.check_grounded(id, "d1").unwrap());
    let health_row = store.get_drone_health(&id);
    assert!(health_row.grounded_until_secs.is_some());
    let req = rx.try_recv().unwrap();
    assert_eq!(req.drone_id, id);
}

#[test]
fn stays_grounded_until_expiry_then_resets() {
    let (store, _events, clock, health, _rx) = setup();
    let id = NodeId::new();
    for _ in 0..8 {
        store.record_drone_failure(id, clock.now_secs()).unwrap();
    }
    assert!(health.check_grounded(id, "d1").unwrap());
    // Still within the window.
    assert!(health.check_grounded(id, "d1").unwrap());

    clock.advance(std::time::Duration::from_secs(5 * 60));
    assert!(!health.check_grounded(id, "d1").unwrap());
    assert_eq!(store.get_drone_health(&id).build_failure_count, 0);
}

#[test]
fn grounding_reclaims_delegated_work() {
    let (store, _events, clock, health, _rx) = setup();
    let id = NodeId::new();
    store.queue_packages(&["=a/b-1".to_string()], None, 0).unwrap();
    let entry = store.get_needed_packages(1, None).remove(0);
    store.assign_package(entry.id, id, 0).unwrap();

    for _ in 0..8 {
        store.record_drone_failure(id, clock.now_secs()).unwrap();
    }
    health.check_grounded(id, "d1").unwrap();

    let reloaded = store.get_queue_entry(&entry.id).unwrap();
    assert_eq!(reloaded.status, sw_core::QueueStatus::Needed);
    assert!(reloaded.owner.is_none());
}

#[test]
fn upload_impaired_respects_retry_window() {
    let (store, _events, clock, health, _rx) = setup();
    let id = NodeId::new();
    for _ in 0..3 {
        store.record_upload_failure(id, clock.now_secs()).unwrap();
    }
    assert!(health.is_upload_impaired(&id, 3, 30));
    clock.advance(std::time::Duration::from_secs(31 * 60));
    assert!(!health.is_upload_impaired(&id, 3, 30));
}

#[tokio::test]
async fn probe_persists_result() {
    let (store, _events, _clock, health, _rx) = setup();
    let id = NodeId::new();
    let result = health.probe_drone_health(id, "10.0.0.1").await.unwrap();
    assert_eq!(result.status, sw_core::ProbeStatus::Ok);
    assert!(store.get_drone_health(&id).last_probe_result.is_some());
}
