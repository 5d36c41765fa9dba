// SPDX-License-Identifier: MIT

//! Work scheduler: the single entry point a drone calls on
//! every poll, plus work stealing, reclamation, and auto-aging.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;
use sw_core::{Clock, EventType, NodeId, NodeStatus, SystemClock};
use sw_store::Store;
use sw_store::EventLog;

use crate::config::SchedulerConfig;
use crate::error::EngineResult;
use crate::health::HealthMonitor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkOutcome {
    None,
    Package(String),
    Directive { action: String, expected_timestamp: String },
}

pub struct Scheduler<C: Clock = SystemClock> {
    store: Arc<Store>,
    events: Arc<EventLog>,
    health: Arc<HealthMonitor<C>>,
    config: SchedulerConfig,
    clock: C,
    rebalanced_away: Mutex<HashMap<NodeId, HashSet<String>>>,
}

impl<C: Clock> Scheduler<C> {
    pub fn new(store: Arc<Store>, events: Arc<EventLog>, health: Arc<HealthMonitor<C>>, config: SchedulerConfig, clock: C) -> Self {
        Self { store, events, health, config, clock, rebalanced_away: Mutex::new(HashMap::new()) }
    }

    pub fn get_work(&self, drone_id: NodeId) -> EngineResult<WorkOutcome> {
        let Some(node) = self.store.get_node(&drone_id) else {
            return Ok(WorkOutcome::None);
        };
        let now = self.clock.now_secs();

        if self.is_globally_paused() {
            return Ok(WorkOutcome::None);
        }

        if let Some(expected) = self.expected_portage_timestamp() {
            let advertised = node.capabilities.portage_content_timestamp.as_deref();
            if advertised != Some(expected.as_str()) {
                return Ok(WorkOutcome::Directive { action: "sync_portage".to_string(), expected_timestamp: expected });
            }
        }

        if self.health.check_grounded(drone_id, &node.name)? {
            return Ok(WorkOutcome::None);
        }

        if self.health.is_upload_impaired(&drone_id, self.config.max_upload_failures, self.config.upload_retry_interval_m) {
            return Ok(WorkOutcome::None);
        }

        if let Some(entry) = self.store.get_delegated_packages().into_iter().find(|e| e.owner == Some(drone_id)) {
            return Ok(WorkOutcome::Package(entry.atom));
        }

        let target = self.config.queue_target_for(node.cores);
        if node.is_sweeper(&self.config.sweeper_prefix) {
            self.sweeper_path(drone_id, &node.name, target, now)
        } else {
            self.regular_path(drone_id, &node.name, target, now)
        }
    }

    fn is_globally_paused(&self) -> bool {
        self.store.get_config("paused").map(|c| c.value.as_bool().unwrap_or(false)).unwrap_or(false)
    }

    fn expected_portage_timestamp(&self) -> Option<String> {
        self.store.get_config("portage_content_timestamp").and_then(|c| c.value.as_str().map(str::to_string))
    }

    fn regular_path(&self, drone_id: NodeId, drone_name: &str, target: u32, now: i64) -> EngineResult<WorkOutcome> {
        let candidates = self.store.get_needed_packages((3 * target) as usize, None);
        let mut assigned = 0u32;
        let mut first = None;
        for entry in &candidates {
            if assigned >= target {
                break;
            }
            if self.store.has_drone_failed_package(&drone_id, &entry.atom) {
                continue;
            }
            if self.store.assign_package(entry.id, drone_id, now)? {
                assigned += 1;
                if first.is_none() {
                    first = Some(entry.atom.clone());
                }
            }
        }

        if assigned > 0 {
            self.emit_event(EventType::Assign, format!("assigned {assigned} package(s) to {drone_name}"), Some(drone_id), now)?;
            return Ok(WorkOutcome::Package(first.expect("assigned > 0 implies first is set")));
        }

        if self.store.queue_counts(None).needed == 0 {
            let stolen = self.steal_work(drone_id, drone_name, target, now)?;
            if stolen > 0 {
                if let Some(entry) = self.store.get_delegated_packages().into_iter().find(|e| e.owner == Some(drone_id)) {
                    return Ok(WorkOutcome::Package(entry.atom));
                }
            }
        }

        Ok(WorkOutcome::None)
    }

    fn sweeper_path(&self, drone_id: NodeId, drone_name: &str, target: u32, now: i64) -> EngineResult<WorkOutcome> {
        let blocked = self.store.get_blocked_packages(target as usize);
        let mut first = None;
        for entry in &blocked {
            if self.store.assign_blocked_package(entry.id, drone_id, now)? && first.is_none() {
                first = Some(entry.atom.clone());
            }
        }
        if let Some(atom) = &first {
            self.emit_event(EventType::Assign, format!("sweeper {drone_name} took {atom}"), Some(drone_id), now)?;
        }
        Ok(first.map(WorkOutcome::Package).unwrap_or(WorkOutcome::None))
    }

    /// Steals up to `target` entries from overloaded donors. Returns the
    /// number of entries actually stolen.
    fn steal_work(&self, requester: NodeId, requester_name: &str, target: u32, now: i64) -> EngineResult<u32> {
        if self.store.get_delegated_packages().iter().any(|e| e.owner == Some(requester)) {
            return Ok(0);
        }

        let mut by_owner: HashMap<NodeId, Vec<sw_core::QueueEntry>> = HashMap::new();
        for entry in self.store.get_delegated_packages() {
            if let Some(owner) = entry.owner {
                by_owner.entry(owner).or_default().push(entry);
            }
        }

        let mut donors: Vec<(NodeId, Vec<sw_core::QueueEntry>)> = by_owner
            .into_iter()
            .filter(|(owner, entries)| {
                entries.len() > 2
                    && self
                        .store
                        .get_node(owner)
                        .map(|n| n.status == NodeStatus::Online && !n.is_sweeper(&self.config.sweeper_prefix))
                        .unwrap_or(false)
            })
            .collect();
        donors.sort_by_key(|(_, entries)| std::cmp::Reverse(entries.len()));

        let mut stolen_total = 0u32;
        for (donor_id, mut entries) in donors {
            if stolen_total >= target {
                break;
            }
            entries.sort_by_key(|e| std::cmp::Reverse(e.assigned_at_secs.unwrap_or(0)));
            let max_take = entries.len().saturating_sub(2);
            let take = (entries.len() / 2).min(max_take).min((target - stolen_total) as usize);
            if take == 0 {
                continue;
            }
            for entry in entries.iter().take(take) {
                if self.store.reassign_package(entry.id, requester, now)? {
                    self.rebalanced_away.lock().entry(donor_id).or_default().insert(entry.atom.clone());
                    stolen_total += 1;
                    self.emit_event(
                        EventType::Rebalance,
                        format!("stole {} from donor to {requester_name}", entry.atom),
                        Some(requester),
                        now,
                    )?;
                }
            }
        }
        Ok(stolen_total)
    }

    /// Returns and clears the set of atoms rebalanced away from `drone_id`
    /// since the last call.
    pub fn get_stale_assignments(&self, drone_id: &NodeId) -> HashSet<String> {
        self.rebalanced_away.lock().remove(drone_id).unwrap_or_default()
    }

    pub fn reclaim_offline_work(&self, timeout_hours: i64) -> EngineResult<u64> {
        let now = self.clock.now_secs();
        let mut count = 0u64;
        for entry in self.store.get_delegated_packages() {
            let Some(owner) = entry.owner else { continue };
            let offline = self.store.get_node(&owner).map(|n| n.status != NodeStatus::Online).unwrap_or(true);
            let stale = entry.assigned_at_secs.map(|t| t <= now - timeout_hours * 3600).unwrap_or(false);
            if (offline || stale) && self.store.reclaim_package_by_id(entry.id)? {
                count += 1;
                self.emit_event(EventType::Reclaim, format!("reclaimed {}", entry.atom), Some(owner), now)?;
            }
        }
        Ok(count)
    }

    pub fn auto_age_blocked(&self, failure_age_minutes: i64) -> EngineResult<u64> {
        let now = self.clock.now_secs();
        let mut count = 0u64;
        for entry in self.store.get_blocked_packages(usize::MAX) {
            let Some(history) = self.store.last_history_for_atom(&entry.atom) else { continue };
            if now - history.recorded_at_secs > failure_age_minutes * 60 && self.store.unblock_package(&entry.atom)? {
                count += 1;
                self.emit_event(EventType::Unblock, format!("auto-unblocked {}", entry.atom), None, now)?;
            }
        }
        Ok(count)
    }

    fn emit_event(&self, event_type: EventType, message: String, drone_id: Option<NodeId>, now: i64) -> EngineResult<()> {
        let id = self.store.next_event_id();
        self.events.emit(id, event_type, message, json!({}), drone_id, None, now)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
