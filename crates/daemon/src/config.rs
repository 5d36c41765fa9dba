// SPDX-License-Identifier: MIT

//! Centralized configuration loading: environment variables override an
//! on-disk TOML file, which overrides compiled defaults. Resolved once
//! into a single struct rather than read field-by-field, so whole
//! sub-configs can be handed to the engine components at once.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use sw_engine::{HealthConfig, SchedulerConfig, SelfHealConfig};

use crate::error::DaemonError;

/// Every tunable the control plane exposes as a configuration variable,
/// plus the ambient fields (`releases_base`, `payload_dir`, `admin_key`)
/// the release engine, payload registry, and admin API need to function
/// at all.
#[derive(Debug, Clone)]
pub struct Config {
    pub control_plane_port: u16,
    pub admin_port: u16,
    pub admin_key: Option<String>,
    pub db_path: PathBuf,
    pub log_file: Option<PathBuf>,
    pub staging_path: PathBuf,
    pub binhost_path: PathBuf,
    pub releases_base: PathBuf,
    pub payload_dir: PathBuf,
    pub max_drone_failures: u32,
    pub grounding_timeout_minutes: i64,
    pub failure_age_minutes: i64,
    pub queue_target: u32,
    pub cores_per_slot: u32,
    pub node_timeout_secs: i64,
    pub stale_timeout_hours: i64,
    pub sweeper_prefix: String,
    pub max_upload_failures: u32,
    pub upload_retry_interval_m: i64,
    pub protected_hosts: Vec<String>,
    pub entry_failure_threshold: u32,
    pub wal_compact_threshold_bytes: u64,
}

/// Shape of the on-disk config file (`swarmd.toml`); every field optional so
/// a file only overriding a handful of values is valid.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    control_plane_port: Option<u16>,
    admin_port: Option<u16>,
    admin_key: Option<String>,
    db_path: Option<PathBuf>,
    log_file: Option<PathBuf>,
    staging_path: Option<PathBuf>,
    binhost_path: Option<PathBuf>,
    releases_base: Option<PathBuf>,
    payload_dir: Option<PathBuf>,
    max_drone_failures: Option<u32>,
    grounding_timeout: Option<i64>,
    failure_age_minutes: Option<i64>,
    queue_target: Option<u32>,
    cores_per_slot: Option<u32>,
    node_timeout: Option<i64>,
    stale_timeout: Option<i64>,
    sweeper_prefix: Option<String>,
    max_upload_failures: Option<u32>,
    upload_retry_interval_m: Option<i64>,
    protected_hosts: Option<String>,
    entry_failure_threshold: Option<u32>,
    wal_compact_threshold_bytes: Option<u64>,
}

impl Config {
    /// Resolves `control_plane_port`/`db_path` first since CLI `serve`
    /// flags need to win over everything including the environment; the
    /// rest of the struct follows the file→env precedence below.
    pub fn load(cli_port: Option<u16>, cli_db_path: Option<PathBuf>) -> Result<Self, DaemonError> {
        let file = Self::read_file_config()?;
        let mut config = Self::defaults();
        config.apply_file(&file);
        config.apply_env();
        if let Some(port) = cli_port {
            config.control_plane_port = port;
        }
        if let Some(db) = cli_db_path {
            config.db_path = db;
        }
        Ok(config)
    }

    fn defaults() -> Self {
        Self {
            control_plane_port: 8100,
            admin_port: 8093,
            admin_key: None,
            db_path: default_state_dir().join("swarm.db"),
            log_file: None,
            staging_path: PathBuf::from("./staging"),
            binhost_path: PathBuf::from("./binhost"),
            releases_base: PathBuf::from("./releases"),
            payload_dir: default_state_dir().join("payloads"),
            max_drone_failures: HealthConfig::default().max_drone_failures,
            grounding_timeout_minutes: HealthConfig::default().grounding_timeout_minutes,
            failure_age_minutes: SchedulerConfig::default().failure_age_minutes,
            queue_target: SchedulerConfig::default().queue_target,
            cores_per_slot: SchedulerConfig::default().cores_per_slot,
            node_timeout_secs: 90,
            stale_timeout_hours: SchedulerConfig::default().stale_timeout_hours,
            sweeper_prefix: SchedulerConfig::default().sweeper_prefix,
            max_upload_failures: SchedulerConfig::default().max_upload_failures,
            upload_retry_interval_m: SchedulerConfig::default().upload_retry_interval_m,
            protected_hosts: Vec::new(),
            entry_failure_threshold: SchedulerConfig::default().entry_failure_threshold,
            wal_compact_threshold_bytes: 64 * 1024 * 1024,
        }
    }

    /// Searches, in order, `SWARM_CONFIG_FILE`, `./swarmd.toml`,
    /// `~/.config/swarm/swarmd.toml`, `/etc/swarm/swarmd.toml`.
    fn read_file_config() -> Result<FileConfig, DaemonError> {
        let candidates: Vec<PathBuf> = std::env::var("SWARM_CONFIG_FILE")
            .ok()
            .map(PathBuf::from)
            .into_iter()
            .chain([PathBuf::from("./swarmd.toml")])
            .chain(dirs::config_dir().map(|d| d.join("swarm/swarmd.toml")))
            .chain([PathBuf::from("/etc/swarm/swarmd.toml")])
            .collect();

        for path in candidates {
            if path.is_file() {
                let text = std::fs::read_to_string(&path).map_err(DaemonError::Io)?;
                return toml::from_str(&text)
                    .map_err(|e| DaemonError::Config(format!("{}: {e}", path.display())));
            }
        }
        Ok(FileConfig::default())
    }

    fn apply_file(&mut self, file: &FileConfig) {
        macro_rules! take {
            ($field:ident) => {
                if let Some(v) = file.$field.clone() {
                    self.$field = v;
                }
            };
        }
        take!(control_plane_port);
        take!(admin_port);
        take!(admin_key);
        take!(db_path);
        take!(log_file);
        take!(staging_path);
        take!(binhost_path);
        take!(releases_base);
        take!(payload_dir);
        take!(max_drone_failures);
        take!(failure_age_minutes);
        take!(queue_target);
        take!(cores_per_slot);
        take!(sweeper_prefix);
        take!(max_upload_failures);
        take!(upload_retry_interval_m);
        take!(entry_failure_threshold);
        take!(wal_compact_threshold_bytes);
        if let Some(v) = file.grounding_timeout {
            self.grounding_timeout_minutes = v;
        }
        if let Some(v) = file.node_timeout {
            self.node_timeout_secs = v;
        }
        if let Some(v) = file.stale_timeout {
            self.stale_timeout_hours = v;
        }
        if let Some(csv) = &file.protected_hosts {
            self.protected_hosts = split_csv(csv);
        }
    }

    fn apply_env(&mut self) {
        if let Some(v) = env_u16("CONTROL_PLANE_PORT") {
            self.control_plane_port = v;
        }
        if let Some(v) = env_u16("ADMIN_PORT") {
            self.admin_port = v;
        }
        if let Ok(v) = std::env::var("ADMIN_KEY") {
            if !v.is_empty() {
                self.admin_key = Some(v);
            }
        }
        if let Ok(v) = std::env::var("SWARM_DB_PATH") {
            self.db_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("LOG_FILE") {
            self.log_file = Some(PathBuf::from(v));
        }
        if let Ok(v) = std::env::var("STAGING_PATH") {
            self.staging_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("BINHOST_PATH") {
            self.binhost_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("RELEASES_BASE") {
            self.releases_base = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("PAYLOAD_DIR") {
            self.payload_dir = PathBuf::from(v);
        }
        if let Some(v) = env_u32("MAX_DRONE_FAILURES") {
            self.max_drone_failures = v;
        }
        if let Some(v) = env_i64("GROUNDING_TIMEOUT") {
            self.grounding_timeout_minutes = v;
        }
        if let Some(v) = env_i64("FAILURE_AGE_MINUTES") {
            self.failure_age_minutes = v;
        }
        if let Some(v) = env_u32("QUEUE_TARGET") {
            self.queue_target = v;
        }
        if let Some(v) = env_u32("CORES_PER_SLOT") {
            self.cores_per_slot = v;
        }
        if let Some(v) = env_i64("NODE_TIMEOUT") {
            self.node_timeout_secs = v;
        }
        if let Some(v) = env_i64("STALE_TIMEOUT") {
            self.stale_timeout_hours = v;
        }
        if let Ok(v) = std::env::var("SWEEPER_PREFIX") {
            self.sweeper_prefix = v;
        }
        if let Some(v) = env_u32("MAX_UPLOAD_FAILURES") {
            self.max_upload_failures = v;
        }
        if let Some(v) = env_i64("UPLOAD_RETRY_INTERVAL_M") {
            self.upload_retry_interval_m = v;
        }
        if let Ok(v) = std::env::var("PROTECTED_HOSTS") {
            self.protected_hosts = split_csv(&v);
        }
        if let Some(v) = env_u32("ENTRY_FAILURE_THRESHOLD") {
            self.entry_failure_threshold = v;
        }
        if let Some(v) = env_u64("WAL_COMPACT_THRESHOLD_BYTES") {
            self.wal_compact_threshold_bytes = v;
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            cores_per_slot: self.cores_per_slot,
            queue_target: self.queue_target,
            stale_timeout_hours: self.stale_timeout_hours,
            failure_age_minutes: self.failure_age_minutes,
            sweeper_prefix: self.sweeper_prefix.clone(),
            max_upload_failures: self.max_upload_failures,
            upload_retry_interval_m: self.upload_retry_interval_m,
            entry_failure_threshold: self.entry_failure_threshold,
        }
    }

    pub fn health_config(&self) -> HealthConfig {
        HealthConfig {
            max_drone_failures: self.max_drone_failures,
            grounding_timeout_minutes: self.grounding_timeout_minutes,
            protected_hosts: self.protected_hosts.clone(),
        }
    }

    pub fn selfheal_config(&self) -> SelfHealConfig {
        SelfHealConfig {
            protected_hosts: self.protected_hosts.clone(),
            ..SelfHealConfig::default()
        }
    }
}

fn default_state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("SWARM_STATE_DIR") {
        return PathBuf::from(dir);
    }
    dirs::data_local_dir().map(|d| d.join("swarm")).unwrap_or_else(|| PathBuf::from("./state"))
}

fn split_csv(v: &str) -> Vec<String> {
    v.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

fn env_u16(key: &str) -> Option<u16> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

fn env_u32(key: &str) -> Option<u32> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

fn env_i64(key: &str) -> Option<i64> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

/// Dumps the current resolved config as a flat JSON object, for
/// `GET /admin/v1/config`.
pub fn to_json(config: &Config) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    map.insert("control_plane_port".into(), config.control_plane_port.into());
    map.insert("admin_port".into(), config.admin_port.into());
    map.insert("db_path".into(), path_str(&config.db_path).into());
    map.insert("log_file".into(), config.log_file.as_deref().map(path_str).into());
    map.insert("staging_path".into(), path_str(&config.staging_path).into());
    map.insert("binhost_path".into(), path_str(&config.binhost_path).into());
    map.insert("releases_base".into(), path_str(&config.releases_base).into());
    map.insert("payload_dir".into(), path_str(&config.payload_dir).into());
    map.insert("max_drone_failures".into(), config.max_drone_failures.into());
    map.insert("grounding_timeout_minutes".into(), config.grounding_timeout_minutes.into());
    map.insert("failure_age_minutes".into(), config.failure_age_minutes.into());
    map.insert("queue_target".into(), config.queue_target.into());
    map.insert("cores_per_slot".into(), config.cores_per_slot.into());
    map.insert("node_timeout_secs".into(), config.node_timeout_secs.into());
    map.insert("stale_timeout_hours".into(), config.stale_timeout_hours.into());
    map.insert("sweeper_prefix".into(), config.sweeper_prefix.clone().into());
    map.insert("max_upload_failures".into(), config.max_upload_failures.into());
    map.insert("upload_retry_interval_m".into(), config.upload_retry_interval_m.into());
    map.insert("protected_hosts".into(), config.protected_hosts.clone().into());
    map.insert("entry_failure_threshold".into(), config.entry_failure_threshold.into());
    map.insert("wal_compact_threshold_bytes".into(), config.wal_compact_threshold_bytes.into());
    serde_json::Value::Object(map)
}

fn path_str(p: &Path) -> String {
    p.to_string_lossy().into_owned()
}

/// Applies a runtime `set_config`-style passthrough from the admin API.
/// Only a curated subset of scalar fields may be changed without a
/// restart; everything else requires editing the file and restarting.
pub fn apply_runtime_overrides(config: &mut Config, updates: &HashMap<String, serde_json::Value>) {
    for (key, value) in updates {
        match key.as_str() {
            "max_drone_failures" => set_u32(&mut config.max_drone_failures, value),
            "queue_target" => set_u32(&mut config.queue_target, value),
            "failure_age_minutes" => set_i64(&mut config.failure_age_minutes, value),
            "max_upload_failures" => set_u32(&mut config.max_upload_failures, value),
            "entry_failure_threshold" => set_u32(&mut config.entry_failure_threshold, value),
            _ => {}
        }
    }
}

fn set_u32(field: &mut u32, value: &serde_json::Value) {
    if let Some(n) = value.as_u64() {
        *field = n as u32;
    }
}

fn set_i64(field: &mut i64, value: &serde_json::Value) {
    if let Some(n) = value.as_i64() {
        *field = n;
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
