// SPDX-License-Identifier: MIT

//! Self-healing escalation ladder. Runs on a 30 s tick and
//! is the sole component that issues SSH restart/reboot commands — the
//! Health Monitor only requests escalation (see [`crate::health`]).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;
use sw_adapters::SshAdapter;
use sw_core::{Clock, EventType, Node, NodeId, SystemClock};
use sw_store::{EventLog, Store};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::config::SelfHealConfig;
use crate::error::EngineResult;
use crate::health::EscalationRequest;

#[derive(Debug, Clone, Copy, Default)]
struct EscalationState {
    level: u8,
    last_action_secs: i64,
    attempts: u32,
}

/// `is_reboot_safe`: only explicit lxc/qemu drone types may be rebooted.
pub fn is_reboot_safe(node: &Node) -> bool {
    match node.capabilities.drone_type.as_deref() {
        Some(t) => matches!(t.to_ascii_lowercase().as_str(), "lxc" | "qemu"),
        None => false,
    }
}

pub struct SelfHealer<C: Clock = SystemClock> {
    store: Arc<Store>,
    events: Arc<EventLog>,
    ssh: Arc<dyn SshAdapter>,
    requests: Mutex<UnboundedReceiver<EscalationRequest>>,
    state: Mutex<HashMap<NodeId, EscalationState>>,
    config: SelfHealConfig,
    clock: C,
}

impl<C: Clock> SelfHealer<C> {
    pub fn new(
        store: Arc<Store>,
        events: Arc<EventLog>,
        ssh: Arc<dyn SshAdapter>,
        requests: UnboundedReceiver<EscalationRequest>,
        config: SelfHealConfig,
        clock: C,
    ) -> Self {
        Self { store, events, ssh, requests: Mutex::new(requests), state: Mutex::new(HashMap::new()), config, clock }
    }

    /// Drains any priority escalation requests, then probes every
    /// non-paused drone and steps its ladder state.
    pub async fn tick(&self) -> EngineResult<()> {
        let mut priority = Vec::new();
        {
            let mut rx = self.requests.lock();
            while let Ok(req) = rx.try_recv() {
                priority.push(req.drone_id);
            }
        }
        for drone_id in priority {
            if let Some(node) = self.store.get_node(&drone_id) {
                self.probe_and_escalate(&node).await?;
            }
        }

        let nodes = self.store.get_all_nodes(false, None);
        for node in nodes {
            if node.paused {
                continue;
            }
            self.probe_and_escalate(&node).await?;
        }
        Ok(())
    }

    fn cooldown_for(&self, level: u8) -> i64 {
        match level {
            1 => self.config.level1_cooldown_secs,
            2 => self.config.level2_cooldown_secs,
            3 => self.config.level3_cooldown_secs,
            _ => 0,
        }
    }

    async fn probe_and_escalate(&self, node: &Node) -> EngineResult<()> {
        let healthy = matches!(
            self.ssh.probe(&node.address).await,
            Ok(sw_core::ProbeResult { status: sw_core::ProbeStatus::Ok, .. })
        );
        let now = self.clock.now_secs();

        let previous_level = {
            let mut map = self.state.lock();
            map.entry(node.id).or_default().level
        };

        if healthy {
            let mut map = self.state.lock();
            let entry = map.entry(node.id).or_default();
            entry.level = 0;
            entry.attempts = 0;
            drop(map);
            if previous_level > 0 {
                self.emit(node.id, EventType::Heal, format!("{} recovered", node.name), now)?;
            }
            return Ok(());
        }

        let last_action_secs = self.state.lock().get(&node.id).map(|s| s.last_action_secs).unwrap_or(0);
        if now - last_action_secs < self.cooldown_for(previous_level) {
            return Ok(());
        }

        let target_level = match previous_level {
            0 => 1,
            1 => 2,
            2 => {
                if is_reboot_safe(node) {
                    3
                } else {
                    4
                }
            }
            _ => 4,
        };

        match target_level {
            1 => {
                let _ = self.ssh.restart_service(&node.address).await;
            }
            2 => {
                let _ = self.ssh.kill_and_restart(&node.address).await;
            }
            3 => match self.ssh.reboot_container(&node.address, &self.config.protected_hosts).await {
                Ok(()) => {}
                Err(sw_adapters::AdapterError::Protected(_)) => {
                    self.set_level(node.id, 4, now);
                    self.emit(node.id, EventType::Alert, format!("{} reboot refused (protected host)", node.name), now)?;
                    return Ok(());
                }
                Err(_) => {}
            },
            _ => {
                self.emit(node.id, EventType::Alert, format!("{} still unhealthy after full escalation ladder", node.name), now)?;
            }
        }

        self.set_level(node.id, target_level, now);
        Ok(())
    }

    fn set_level(&self, id: NodeId, level: u8, now: i64) {
        let mut map = self.state.lock();
        let entry = map.entry(id).or_default();
        entry.level = level;
        entry.last_action_secs = now;
        entry.attempts += 1;
    }

    fn emit(&self, drone_id: NodeId, event_type: EventType, message: String, now: i64) -> EngineResult<()> {
        let id = self.store.next_event_id();
        self.events.emit(id, event_type, message, json!({}), Some(drone_id), None, now)?;
        Ok(())
    }

    pub fn escalation_level(&self, id: &NodeId) -> u8 {
        self.state.lock().get(id).map(|s| s.level).unwrap_or(0)
    }
}

#[cfg(test)]
#[path = "selfheal_tests.rs"]
mod tests;
