// SPDX-License-Identifier: MIT

use super::*;
use sw_adapters::fake::FakeSsh;
use sw_core::{Capabilities, FakeClock, NodeKind, NodeRegistration, NodeStatus, ProbeChecks, ProbeResult, ProbeStatus};
use sw_store::{EventLog, Store};
use tempfile::tempdir;

fn setup() -> (Arc<Store>, Arc<EventLog>, Arc<FakeSsh>, FakeClock, tokio::sync::mpsc::UnboundedSender<EscalationRequest>) {
    let dir = tempdir().unwrap();
    let store = Arc::new(Store::open(dir.path().join("swarm.wal")).unwrap());
    let events = Arc::new(EventLog::open(dir.path().join("events.log")).unwrap());
    let ssh = Arc::new(FakeSsh::new());
    let clock = FakeClock::new();
    let (tx, _rx) = crate::health::escalation_channel();
    (store, events, ssh, clock, tx)
}

fn register(store: &Store, name: &str, drone_type: Option<&str>) -> sw_core::NodeId {
    let id = sw_core::NodeId::new();
    store
        .upsert_node(
            NodeRegistration {
                id,
                name: name.to_string(),
                address: "10.0.0.5".to_string(),
                secondary_address: None,
                kind: Some(NodeKind::Drone),
                cores: Some(8),
                ram_mb: None,
                capabilities: Capabilities { drone_type: drone_type.map(|s| s.to_string()), ..Default::default() },
                metrics: Default::default(),
                current_task: None,
                version: None,
            },
            0,
        )
        .unwrap();
    id
}

#[test]
fn reboot_safety_gate() {
    let mut node = sw_core::Node {
        id: sw_core::NodeId::new(),
        name: "d1".into(),
        address: "x".into(),
        secondary_address: None,
        kind: NodeKind::Drone,
        cores: None,
        ram_mb: None,
        capabilities: Capabilities::default(),
        metrics: Default::default(),
        current_task: None,
        version: None,
        last_seen_secs: 0,
        status: NodeStatus::Online,
        paused: false,
    };
    assert!(!is_reboot_safe(&node));
    node.capabilities.drone_type = Some("bare-metal".into());
    assert!(!is_reboot_safe(&node));
    node.capabilities.drone_type = Some("LXC".into());
    assert!(is_reboot_safe(&node));
    node.capabilities.drone_type = Some("qemu".into());
    assert!(is_reboot_safe(&node));
}

#[tokio::test]
async fn escalates_one_level_per_unhealthy_tick() {
    let (store, events, ssh, clock, tx) = setup();
    let id = register(&store, "d1", Some("lxc"));
    ssh.set_probe("10.0.0.5", Ok(ProbeResult { status: ProbeStatus::ServiceDown, checks: ProbeChecks::default() }));
    let (_tx2, rx) = crate::health::escalation_channel();
    let _ = tx;
    let healer = SelfHealer::new(store.clone(), events, ssh.clone(), rx, SelfHealConfig::default(), clock.clone());

    healer.tick().await.unwrap();
    assert_eq!(healer.escalation_level(&id), 1);
    assert_eq!(ssh.restart_calls.lock().len(), 1);

    clock.advance(std::time::Duration::from_secs(31));
    healer.tick().await.unwrap();
    assert_eq!(healer.escalation_level(&id), 2);
    assert_eq!(ssh.kill_restart_calls.lock().len(), 1);
}

#[tokio::test]
async fn recovery_resets_to_level_zero_and_emits_heal() {
    let (store, events, ssh, clock, _tx) = setup();
    let id = register(&store, "d1", Some("lxc"));
    ssh.set_probe("10.0.0.5", Ok(ProbeResult { status: ProbeStatus::ServiceDown, checks: ProbeChecks::default() }));
    let (_tx2, rx) = crate::health::escalation_channel();
    let healer = SelfHealer::new(store.clone(), events.clone(), ssh.clone(), rx, SelfHealConfig::default(), clock.clone());
    healer.tick().await.unwrap();
    assert_eq!(healer.escalation_level(&id), 1);

    ssh.set_probe("10.0.0.5", Ok(ProbeResult { status: ProbeStatus::Ok, checks: ProbeChecks::default() }));
    healer.tick().await.unwrap();
    assert_eq!(healer.escalation_level(&id), 0);
}

#[tokio::test]
async fn non_reboot_safe_drone_skips_straight_to_alert() {
    let (store, events, ssh, clock, _tx) = setup();
    let id = register(&store, "d1", Some("bare-metal"));
    ssh.set_probe("10.0.0.5", Ok(ProbeResult { status: ProbeStatus::ServiceDown, checks: ProbeChecks::default() }));
    let (_tx2, rx) = crate::health::escalation_channel();
    let healer = SelfHealer::new(store.clone(), events, ssh.clone(), rx, SelfHealConfig::default(), clock.clone());

    healer.tick().await.unwrap();
    clock.advance(std::time::Duration::from_secs(31));
    healer.tick().await.unwrap();
    assert_eq!(healer.escalation_level(&id), 4);
    assert!(ssh.reboot_calls.lock().is_empty());
}

#[tokio::test]
async fn priority_escalation_request_is_drained_first() {
    let (store, events, ssh, clock, _tx) = setup();
    let id = register(&store, "d1", Some("lxc"));
    ssh.set_probe("10.0.0.5", Ok(ProbeResult { status: ProbeStatus::ServiceDown, checks: ProbeChecks::default() }));
    let (tx, rx) = crate::health::escalation_channel();
    tx.send(EscalationRequest { drone_id: id }).unwrap();
    let healer = SelfHealer::new(store.clone(), events, ssh.clone(), rx, SelfHealConfig::default(), clock.clone());

    healer.tick().await.unwrap();
    assert_eq!(healer.escalation_level(&id), 1);
}
