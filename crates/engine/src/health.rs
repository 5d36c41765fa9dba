// SPDX-License-Identifier: MIT

//! Drone health circuit breaker.
//!
//! Grounding's restart/reboot intent is not executed here. Per the
//! resolved Open Question (see DESIGN.md), Self-Healing is the only
//! component that issues SSH restart/reboot commands; grounding instead
//! emits an event and posts an [`EscalationRequest`] onto a shared channel
//! that the self-heal loop drains each tick.

use std::sync::Arc;

use serde_json::json;
use sw_adapters::SshAdapter;
use sw_core::{Clock, EventType, NodeId, ProbeChecks, ProbeResult, ProbeStatus, QueueStatus, SystemClock};
use sw_store::{EventLog, Store};
use tokio::sync::mpsc::UnboundedSender;

use crate::config::HealthConfig;
use crate::error::EngineResult;

/// Request sent to the self-heal loop when grounding first triggers for a
/// drone, so it escalates that drone ahead of its normal 30s cadence.
#[derive(Debug, Clone, Copy)]
pub struct EscalationRequest {
    pub drone_id: NodeId,
}

pub fn escalation_channel() -> (UnboundedSender<EscalationRequest>, tokio::sync::mpsc::UnboundedReceiver<EscalationRequest>) {
    tokio::sync::mpsc::unbounded_channel()
}

pub struct HealthMonitor<C: Clock = SystemClock> {
    store: Arc<Store>,
    events: Arc<EventLog>,
    ssh: Arc<dyn SshAdapter>,
    escalate: UnboundedSender<EscalationRequest>,
    config: HealthConfig,
    clock: C,
}

impl<C: Clock> HealthMonitor<C> {
    pub fn new(
        store: Arc<Store>,
        events: Arc<EventLog>,
        ssh: Arc<dyn SshAdapter>,
        escalate: UnboundedSender<EscalationRequest>,
        config: HealthConfig,
        clock: C,
    ) -> Self {
        Self { store, events, ssh, escalate, config, clock }
    }

    pub fn record_failure(&self, drone_id: NodeId) -> EngineResult<sw_core::DroneHealth> {
        Ok(self.store.record_drone_failure(drone_id, self.clock.now_secs())?)
    }

    pub fn record_success(&self, drone_id: NodeId) -> EngineResult<()> {
        Ok(self.store.reset_drone_health(Some(drone_id))?)
    }

    /// Returns true iff the drone should be excluded from work assignment.
    /// Side effects (event, reclaim, escalation request) only fire the
    /// first time grounding is observed; subsequent calls while still
    /// within the grounding window just return true.
    pub fn check_grounded(&self, drone_id: NodeId, drone_name: &str) -> EngineResult<bool> {
        let health = self.store.get_drone_health(&drone_id);
        if health.build_failure_count < self.config.max_drone_failures {
            return Ok(false);
        }
        let now = self.clock.now_secs();
        if let Some(until) = health.grounded_until_secs {
            if now >= until {
                self.store.reset_drone_health(Some(drone_id))?;
                return Ok(false);
            }
            return Ok(true);
        }

        let until = now + self.config.grounding_timeout_minutes * 60;
        self.store.ground_drone(drone_id, until)?;

        let id = self.store.next_event_id();
        self.events.emit(
            id,
            EventType::Grounded,
            format!("{drone_name} grounded after {} consecutive failures", health.build_failure_count),
            json!({ "until_secs": until }),
            Some(drone_id),
            None,
            now,
        )?;

        for entry in self.store.get_delegated_packages() {
            if entry.status == QueueStatus::Delegated && entry.owner == Some(drone_id) {
                self.store.reclaim_package_by_id(entry.id)?;
            }
        }

        let _ = self.escalate.send(EscalationRequest { drone_id });
        Ok(true)
    }

    pub fn is_upload_impaired(&self, drone_id: &NodeId, threshold: u32, retry_minutes: i64) -> bool {
        let health = self.store.get_drone_health(drone_id);
        if health.upload_failure_count < threshold {
            return false;
        }
        match health.last_upload_failure_secs {
            Some(last) => self.clock.now_secs() - last < retry_minutes * 60,
            None => false,
        }
    }

    pub fn record_upload_failure(&self, drone_id: NodeId) -> EngineResult<()> {
        self.store.record_upload_failure(drone_id, self.clock.now_secs())?;
        Ok(())
    }

    pub fn reset_upload_failures(&self, drone_id: NodeId) -> EngineResult<()> {
        Ok(self.store.reset_upload_failures(drone_id)?)
    }

    pub async fn probe_drone_health(&self, drone_id: NodeId, address: &str) -> EngineResult<ProbeResult> {
        let result = match self.ssh.probe(address).await {
            Ok(r) => r,
            Err(sw_adapters::AdapterError::Unreachable) => {
                ProbeResult { status: ProbeStatus::Unreachable, checks: ProbeChecks::default() }
            }
            Err(sw_adapters::AdapterError::Timeout) => {
                ProbeResult { status: ProbeStatus::Timeout, checks: ProbeChecks::default() }
            }
            Err(_) => ProbeResult { status: ProbeStatus::Error, checks: ProbeChecks::default() },
        };
        self.store.set_probe_result(drone_id, result.clone())?;
        Ok(result)
    }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
