// SPDX-License-Identifier: MIT

use super::*;
use tempfile::tempdir;

#[test]
fn events_since_is_monotonic_and_filtered() {
    let dir = tempdir().unwrap();
    let log = EventLog::open(dir.path().join("events.log")).unwrap();
    log.emit(1, EventType::Assign, "assigned", serde_json::json!({}), None, None, 10).unwrap();
    log.emit(2, EventType::Complete, "completed", serde_json::json!({}), None, None, 11).unwrap();
    let (events, latest) = log.since(1);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].id, 2);
    assert_eq!(latest, 2);
}

#[test]
fn ring_buffer_hydrates_from_disk_on_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.log");
    {
        let log = EventLog::open(&path).unwrap();
        for i in 0..5u64 {
            log.emit(i, EventType::Other, format!("evt {i}"), serde_json::json!({}), None, None, i as i64).unwrap();
        }
    }
    let log = EventLog::open(&path).unwrap();
    assert_eq!(log.recent(10).len(), 5);
}

#[test]
fn ring_buffer_caps_at_200() {
    let dir = tempdir().unwrap();
    let log = EventLog::open(dir.path().join("events.log")).unwrap();
    for i in 0..250u64 {
        log.emit(i, EventType::Other, "x", serde_json::json!({}), None, None, 0).unwrap();
    }
    let (events, _) = log.since(0);
    assert_eq!(events.len(), 200);
}
