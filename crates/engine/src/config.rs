// SPDX-License-Identifier: MIT

//! Tunables for the scheduler/health/self-heal modules. `sw-daemon::Config`
//! owns the authoritative values loaded from env/file/defaults and builds
//! these from its own fields; the defaults here exist so engine tests don't
//! need to construct a full daemon config.

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub cores_per_slot: u32,
    pub queue_target: u32,
    pub stale_timeout_hours: i64,
    pub failure_age_minutes: i64,
    pub sweeper_prefix: String,
    pub max_upload_failures: u32,
    pub upload_retry_interval_m: i64,
    pub entry_failure_threshold: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            cores_per_slot: 4,
            queue_target: 5,
            stale_timeout_hours: 2,
            failure_age_minutes: 30,
            sweeper_prefix: "sweeper".to_string(),
            max_upload_failures: 3,
            upload_retry_interval_m: 30,
            entry_failure_threshold: 5,
        }
    }
}

impl SchedulerConfig {
    /// `max(1, cores / cores_per_slot)`, falling back to `queue_target` when
    /// cores are unknown.
    pub fn queue_target_for(&self, cores: Option<u32>) -> u32 {
        match cores {
            Some(cores) => (cores / self.cores_per_slot.max(1)).max(1),
            None => self.queue_target.max(1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HealthConfig {
    pub max_drone_failures: u32,
    pub grounding_timeout_minutes: i64,
    pub protected_hosts: Vec<String>,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            max_drone_failures: 8,
            grounding_timeout_minutes: 5,
            protected_hosts: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SelfHealConfig {
    pub protected_hosts: Vec<String>,
    pub level1_cooldown_secs: i64,
    pub level2_cooldown_secs: i64,
    pub level3_cooldown_secs: i64,
}

impl Default for SelfHealConfig {
    fn default() -> Self {
        Self {
            protected_hosts: Vec::new(),
            level1_cooldown_secs: 30,
            level2_cooldown_secs: 30,
            level3_cooldown_secs: 120,
        }
    }
}
