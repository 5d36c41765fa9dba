// SPDX-License-Identifier: MIT

use super::*;
use sw_core::{CompletionStatus, NodeKind, NodeRegistration, ReleaseStatus};
use tempfile::tempdir;

fn open_store() -> (tempfile::TempDir, Store) {
    let dir = tempdir().unwrap();
    let store = Store::open(dir.path().join("swarm.wal")).unwrap();
    (dir, store)
}

fn reg(id: &str, name: &str, cores: u32) -> NodeRegistration {
    NodeRegistration {
        id: sw_core::NodeId::from_string(id),
        name: name.to_string(),
        address: "10.0.0.1:9".to_string(),
        secondary_address: None,
        kind: Some(NodeKind::Drone),
        cores: Some(cores),
        ram_mb: Some(1024),
        capabilities: Default::default(),
        metrics: Default::default(),
        current_task: None,
        version: None,
    }
}

#[test]
fn upsert_node_is_idempotent() {
    let (_dir, store) = open_store();
    let registered = store.upsert_node(reg("node-d1", "d1", 8), 100).unwrap();
    assert_eq!(registered, Registered::Created);
    let registered = store.upsert_node(reg("node-d1", "d1", 8), 101).unwrap();
    assert_eq!(registered, Registered::Updated);
    assert_eq!(store.get_all_nodes(true, None).len(), 1);
}

#[test]
fn name_collision_deletes_older_id() {
    let (_dir, store) = open_store();
    store.upsert_node(reg("node-a", "shared", 4), 100).unwrap();
    store.upsert_node(reg("node-b", "shared", 4), 101).unwrap();
    let all = store.get_all_nodes(true, None);
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, sw_core::NodeId::from_string("node-b"));
}

#[test]
fn queue_packages_dedupes_active_entries() {
    let (_dir, store) = open_store();
    let added = store.queue_packages(&["=a/b-1".to_string()], None, 0).unwrap();
    assert_eq!(added, 1);
    let added_again = store.queue_packages(&["=a/b-1".to_string()], None, 0).unwrap();
    assert_eq!(added_again, 0);
}

#[test]
fn assign_package_is_conditional() {
    let (_dir, store) = open_store();
    store.queue_packages(&["=a/b-1".to_string()], None, 0).unwrap();
    let entry = store.get_needed_packages(1, None).remove(0);
    let drone = sw_core::NodeId::new();
    assert!(store.assign_package(entry.id, drone, 10).unwrap());
    // Second attempt on the same (already-delegated) entry loses the race.
    assert!(!store.assign_package(entry.id, sw_core::NodeId::new(), 11).unwrap());
}

#[test]
fn happy_path_two_packages_received() {
    let (_dir, store) = open_store();
    store.upsert_node(reg("node-d1", "d1", 8), 0).unwrap();
    store.queue_packages(&["=a/b-1".to_string(), "=a/c-2".to_string()], None, 0).unwrap();
    let needed = store.get_needed_packages(10, None);
    assert_eq!(needed.len(), 2);
    let drone = sw_core::NodeId::from_string("node-d1");
    for e in &needed {
        assert!(store.assign_package(e.id, drone, 1).unwrap());
    }
    let counts = store.queue_counts(None);
    assert_eq!(counts.delegated, 2);
    assert_eq!(counts.needed, 0);

    for e in &needed {
        let outcome = store
            .complete_package(&e.atom, drone, CompletionStatus::Success, Some(1.0), None, 2, 5)
            .unwrap();
        assert_eq!(outcome, CompleteOutcome::Received);
    }
    let counts = store.queue_counts(None);
    assert_eq!(counts.received, 2);
    assert_eq!(counts.delegated, 0);
    assert_eq!(store.get_build_history(10, None).iter().filter(|r| r.status.is_success()).count(), 2);
}

#[test]
fn failure_blocks_after_threshold() {
    let (_dir, store) = open_store();
    store.queue_packages(&["=x/y-1".to_string()], None, 0).unwrap();
    let drone = sw_core::NodeId::new();
    for i in 0..5u32 {
        let entry = store.get_needed_packages(1, None);
        let entry = entry.first().cloned().unwrap_or_else(|| store.get_queue_entry_by_atom("=x/y-1").unwrap());
        if entry.status == sw_core::QueueStatus::Needed {
            store.assign_package(entry.id, drone, i as i64).unwrap();
        }
        let outcome = store
            .complete_package("=x/y-1", drone, CompletionStatus::Failed, None, Some("boom".into()), i as i64, 5)
            .unwrap();
        if i < 4 {
            assert_eq!(outcome, CompleteOutcome::ReturnedToNeeded);
        } else {
            assert_eq!(outcome, CompleteOutcome::BlockedAfterFailures);
        }
    }
    let blocked = store.get_blocked_packages(10);
    assert_eq!(blocked.len(), 1);
    assert_eq!(blocked[0].failure_count, 5);
}

#[test]
fn stale_completion_is_ignored_for_non_owner() {
    let (_dir, store) = open_store();
    store.queue_packages(&["=a/b-1".to_string()], None, 0).unwrap();
    let entry = store.get_needed_packages(1, None).remove(0);
    let d1 = sw_core::NodeId::from_string("node-d1");
    let d2 = sw_core::NodeId::from_string("node-d2");
    store.assign_package(entry.id, d1, 0).unwrap();
    store.reassign_package(entry.id, d2, 1).unwrap();
    assert!(!store.is_package_assigned_to("=a/b-1", &d1));
    let outcome = store.complete_package("=a/b-1", d1, CompletionStatus::Success, None, None, 2, 5).unwrap();
    assert_eq!(outcome, CompleteOutcome::Ignored);
    // d2 still owns it, unaffected.
    assert!(store.is_package_assigned_to("=a/b-1", &d2));
}

#[test]
fn unblock_all_clears_blocked_and_resets_failure_count() {
    let (_dir, store) = open_store();
    store.queue_packages(&["=x/y-1".to_string()], None, 0).unwrap();
    let drone = sw_core::NodeId::new();
    for i in 0..5 {
        let entry = store.get_queue_entry_by_atom("=x/y-1").unwrap();
        if entry.status == sw_core::QueueStatus::Needed {
            store.assign_package(entry.id, drone, i).unwrap();
        }
        store.complete_package("=x/y-1", drone, CompletionStatus::Failed, None, None, i, 5).unwrap();
    }
    assert_eq!(store.get_blocked_packages(10).len(), 1);
    store.unblock_all().unwrap();
    assert_eq!(store.get_blocked_packages(10).len(), 0);
    let entry = store.get_queue_entry_by_atom("=x/y-1").unwrap();
    assert_eq!(entry.failure_count, 0);
    assert_eq!(entry.status, sw_core::QueueStatus::Needed);
}

#[test]
fn reset_queue_leaves_only_needed_and_received() {
    let (_dir, store) = open_store();
    store.queue_packages(&["=a-1".to_string(), "=a-2".to_string()], None, 0).unwrap();
    let entries = store.get_needed_packages(10, None);
    let drone = sw_core::NodeId::new();
    store.assign_package(entries[0].id, drone, 0).unwrap();
    store.complete_package(&entries[0].atom, drone, CompletionStatus::Success, None, None, 1, 5).unwrap();
    store.assign_package(entries[1].id, drone, 0).unwrap();

    store.reset_queue(None).unwrap();
    let counts = store.queue_counts(None);
    assert_eq!(counts.delegated, 0);
    assert_eq!(counts.blocked, 0);
    assert_eq!(counts.needed + counts.received, 2);
}

#[test]
fn only_one_active_session_at_a_time() {
    let (_dir, store) = open_store();
    let s1 = store.start_session("first", 0).unwrap();
    let s2 = store.start_session("second", 1).unwrap();
    assert_eq!(store.get_active_session().unwrap().id, s2);
    let first = store.get_session(&s1).unwrap();
    assert_eq!(first.status, sw_core::SessionStatus::Completed);
}

#[test]
fn has_drone_failed_package_excludes_upload_failures() {
    let (_dir, store) = open_store();
    store.queue_packages(&["=a-1".to_string()], None, 0).unwrap();
    let drone = sw_core::NodeId::new();
    let entry = store.get_needed_packages(1, None).remove(0);
    store.assign_package(entry.id, drone, 0).unwrap();
    store.complete_package("=a-1", drone, CompletionStatus::UploadFailed, None, None, 1, 5).unwrap();
    assert!(!store.has_drone_failed_package(&drone, "=a-1"));
}

#[test]
fn exactly_one_active_release_enforced_on_promotion() {
    let (_dir, store) = open_store();
    let r1 = sw_core::Release {
        id: sw_core::ReleaseId::new(),
        version: "1".into(),
        name: None,
        notes: None,
        status: ReleaseStatus::Active,
        package_count: 2,
        size_mb: 1.0,
        path: "/releases/1".into(),
        created_at_secs: 0,
        created_by: "t".into(),
        promoted_at_secs: Some(0),
        archived_at_secs: None,
    };
    store.insert_release(r1.clone()).unwrap();
    let mut r2 = r1.clone();
    r2.id = sw_core::ReleaseId::new();
    r2.version = "2".into();
    r2.promoted_at_secs = Some(5);
    store.insert_release(r2).unwrap();

    let actives: Vec<_> = store.list_releases().into_iter().filter(|r| r.status == ReleaseStatus::Active).collect();
    assert_eq!(actives.len(), 1);
    assert_eq!(actives[0].version, "2");
}

#[test]
fn wal_replay_reconstructs_state() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("swarm.wal");
    {
        let store = Store::open(&path).unwrap();
        store.upsert_node(reg("node-d1", "d1", 8), 0).unwrap();
        store.queue_packages(&["=a-1".to_string()], None, 0).unwrap();
    }
    let store = Store::open(&path).unwrap();
    assert!(store.get_node_by_name("d1").is_some());
    assert_eq!(store.get_needed_packages(10, None).len(), 1);
}

#[test]
fn checkpoint_compacts_and_state_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("swarm.wal");
    {
        let store = Store::open(&path).unwrap();
        store.upsert_node(reg("node-d1", "d1", 8), 0).unwrap();
        store.checkpoint().unwrap();
        store.queue_packages(&["=a-1".to_string()], None, 0).unwrap();
    }
    let store = Store::open(&path).unwrap();
    assert!(store.get_node_by_name("d1").is_some());
    assert_eq!(store.get_needed_packages(10, None).len(), 1);
}
