// SPDX-License-Identifier: MIT

use super::*;
use sw_adapters::fake::FakeSsh;
use sw_core::{Capabilities, CompletionStatus, FakeClock, MetricsSnapshot, NodeKind, NodeRegistration};
use sw_store::{EventLog, Store};
use tempfile::tempdir;

struct Harness {
    store: Arc<Store>,
    scheduler: Scheduler<FakeClock>,
    clock: FakeClock,
}

fn harness() -> Harness {
    let dir = tempdir().unwrap();
    let store = Arc::new(Store::open(dir.path().join("swarm.wal")).unwrap());
    let events = Arc::new(EventLog::open(dir.path().join("events.log")).unwrap());
    let clock = FakeClock::new();
    let ssh: Arc<dyn SshAdapter> = Arc::new(FakeSsh::new());
    let (tx, _rx) = crate::health::escalation_channel();
    let health = Arc::new(HealthMonitor::new(store.clone(), events.clone(), ssh, tx, crate::config::HealthConfig::default(), clock.clone()));
    let scheduler = Scheduler::new(store.clone(), events, health, SchedulerConfig::default(), clock.clone());
    Harness { store, scheduler, clock }
}

fn register(store: &Store, name: &str, cores: u32, now: i64) -> NodeId {
    let id = NodeId::new();
    store
        .upsert_node(
            NodeRegistration {
                id,
                name: name.to_string(),
                address: "10.0.0.1".to_string(),
                secondary_address: None,
                kind: Some(NodeKind::Drone),
                cores: Some(cores),
                ram_mb: None,
                capabilities: Capabilities::default(),
                metrics: MetricsSnapshot::default(),
                current_task: None,
                version: None,
            },
            now,
        )
        .unwrap();
    id
}

#[test]
fn queue_target_clamps_to_at_least_one() {
    let cfg = SchedulerConfig { queue_target: 0, ..Default::default() };
    assert_eq!(cfg.queue_target_for(Some(0)), 1);
    assert_eq!(cfg.queue_target_for(None), 1);
}

#[test]
fn happy_path_assigns_target_packages() {
    let h = harness();
    let d1 = register(&h.store, "d1", 8, 0);
    h.store.queue_packages(&["=a/b-1".to_string(), "=a/c-2".to_string()], None, 0).unwrap();

    let outcome = h.scheduler.get_work(d1).unwrap();
    assert_eq!(outcome, WorkOutcome::Package("=a/b-1".to_string()));

    let counts = h.store.queue_counts(None);
    assert_eq!(counts.delegated, 2);
    assert_eq!(counts.needed, 0);
}

#[test]
fn sticky_assignment_no_reshuffle() {
    let h = harness();
    let d1 = register(&h.store, "d1", 4, 0);
    h.store.queue_packages(&["=a/b-1".to_string()], None, 0).unwrap();
    let first = h.scheduler.get_work(d1).unwrap();
    let second = h.scheduler.get_work(d1).unwrap();
    assert_eq!(first, second);
}

#[test]
fn failure_then_block_after_five_failures() {
    let h = harness();
    let d1 = register(&h.store, "d1", 4, 0);
    h.store.queue_packages(&["=x/y-1".to_string()], None, 0).unwrap();

    for _ in 0..5 {
        h.scheduler.get_work(d1).unwrap();
        h.store
            .complete_package("=x/y-1", d1, CompletionStatus::Failed, None, Some("boom".into()), 0, 5)
            .unwrap();
    }

    let blocked = h.store.get_blocked_packages(10);
    assert_eq!(blocked.len(), 1);
    assert_eq!(blocked[0].failure_count, 5);
}

#[test]
fn stealing_splits_overloaded_donor_queue() {
    // d1 has enough cores to drain the whole queue (4 atoms, target 4), so
    // d2 finds nothing needed and steals half of d1's queue instead.
    let h = harness();
    let d1 = register(&h.store, "d1", 16, 0);
    let d2 = register(&h.store, "d2", 8, 0);
    let atoms: Vec<String> = (0..4).map(|i| format!("=a/p{i}-1")).collect();
    h.store.queue_packages(&atoms, None, 0).unwrap();

    h.scheduler.get_work(d1).unwrap();
    let counts = h.store.queue_counts(None);
    assert_eq!(counts.delegated, 4);
    assert_eq!(counts.needed, 0);

    let outcome = h.scheduler.get_work(d2).unwrap();
    assert!(matches!(outcome, WorkOutcome::Package(_)));
    let counts = h.store.queue_counts(None);
    assert_eq!(counts.delegated, 4);
    assert_eq!(counts.needed, 0);

    let d1_owned = h.store.get_delegated_packages().into_iter().filter(|e| e.owner == Some(d1)).count();
    let d2_owned = h.store.get_delegated_packages().into_iter().filter(|e| e.owner == Some(d2)).count();
    assert_eq!(d1_owned, 2, "half of d1's queue is stolen");
    assert_eq!(d2_owned, 2);
}

#[test]
fn stealing_leaves_exactly_two_on_a_three_entry_donor() {
    // A donor with exactly 3 entries loses exactly 1 (floor(3/2)), landing
    // on the floor of 2 remaining -- it is not skipped as a donor outright
    // (only donors with <= 2 entries are, since they'd go below the floor).
    let h = harness();
    let d1 = register(&h.store, "d1", 12, 0);
    let d2 = register(&h.store, "d2", 8, 0);
    let atoms: Vec<String> = (0..3).map(|i| format!("=a/p{i}-1")).collect();
    h.store.queue_packages(&atoms, None, 0).unwrap();
    h.scheduler.get_work(d1).unwrap();
    assert_eq!(h.store.queue_counts(None).delegated, 3);

    h.scheduler.get_work(d2).unwrap();
    let d1_owned = h.store.get_delegated_packages().into_iter().filter(|e| e.owner == Some(d1)).count();
    let d2_owned = h.store.get_delegated_packages().into_iter().filter(|e| e.owner == Some(d2)).count();
    assert_eq!(d1_owned, 2, "donor never drops below the floor of 2 remaining");
    assert_eq!(d2_owned, 1);
}

#[test]
fn stealing_skips_a_two_entry_donor_entirely() {
    // A donor with exactly 2 entries is below the `> 2` candidacy floor and
    // contributes nothing, leaving the requester with no work.
    let h = harness();
    let d1 = register(&h.store, "d1", 8, 0);
    let d2 = register(&h.store, "d2", 8, 0);
    let atoms: Vec<String> = (0..2).map(|i| format!("=a/p{i}-1")).collect();
    h.store.queue_packages(&atoms, None, 0).unwrap();
    h.scheduler.get_work(d1).unwrap();
    assert_eq!(h.store.queue_counts(None).delegated, 2);

    let outcome = h.scheduler.get_work(d2).unwrap();
    assert_eq!(outcome, WorkOutcome::None);
    let d1_owned = h.store.get_delegated_packages().into_iter().filter(|e| e.owner == Some(d1)).count();
    assert_eq!(d1_owned, 2);
}

#[test]
fn stale_completion_tracked_on_donor() {
    let h = harness();
    let d1 = register(&h.store, "d1", 32, 0);
    let d2 = register(&h.store, "d2", 16, 0);
    let atoms: Vec<String> = (0..8).map(|i| format!("=a/p{i}-1")).collect();
    h.store.queue_packages(&atoms, None, 0).unwrap();
    h.scheduler.get_work(d1).unwrap();
    assert_eq!(h.store.queue_counts(None).needed, 0);
    h.scheduler.get_work(d2).unwrap();

    let stale = h.scheduler.get_stale_assignments(&d1);
    assert_eq!(stale.len(), 4);
    assert!(h.scheduler.get_stale_assignments(&d1).is_empty(), "cleared after read");
}

#[test]
fn reclaim_offline_work_at_timeout_boundary() {
    let h = harness();
    let d1 = register(&h.store, "d1", 4, 0);
    h.store.queue_packages(&["=a/b-1".to_string()], None, 0).unwrap();
    let entry = h.store.get_needed_packages(1, None).remove(0);
    h.store.assign_package(entry.id, d1, 0).unwrap();

    h.clock.set(2 * 3600);
    let reclaimed = h.scheduler.reclaim_offline_work(2).unwrap();
    assert_eq!(reclaimed, 1);
    assert_eq!(h.store.get_queue_entry(&entry.id).unwrap().status, sw_core::QueueStatus::Needed);
}

#[test]
fn auto_age_blocked_after_failure_age() {
    let h = harness();
    let d1 = register(&h.store, "d1", 4, 0);
    h.store.queue_packages(&["=a/b-1".to_string()], None, 0).unwrap();
    for _ in 0..5 {
        h.scheduler.get_work(d1).unwrap();
        h.store.complete_package("=a/b-1", d1, CompletionStatus::Failed, None, None, 0, 5).unwrap();
    }
    assert_eq!(h.store.get_blocked_packages(10).len(), 1);

    h.clock.set(31 * 60);
    let unblocked = h.scheduler.auto_age_blocked(30).unwrap();
    assert_eq!(unblocked, 1);
    assert_eq!(h.store.get_blocked_packages(10).len(), 0);
}

#[test]
fn sync_portage_directive_on_timestamp_mismatch() {
    let h = harness();
    let d1 = register(&h.store, "d1", 4, 0);
    h.store.set_config("portage_content_timestamp", serde_json::json!("2026-01-01"), 0).unwrap();
    let outcome = h.scheduler.get_work(d1).unwrap();
    assert_eq!(outcome, WorkOutcome::Directive { action: "sync_portage".to_string(), expected_timestamp: "2026-01-01".to_string() });
}

#[test]
fn global_pause_returns_none() {
    let h = harness();
    let d1 = register(&h.store, "d1", 4, 0);
    h.store.queue_packages(&["=a/b-1".to_string()], None, 0).unwrap();
    h.store.set_config("paused", serde_json::json!(true), 0).unwrap();
    assert_eq!(h.scheduler.get_work(d1).unwrap(), WorkOutcome::None);
}
