// SPDX-License-Identifier: MIT

use std::collections::HashMap;

use serial_test::serial;

use super::*;

fn clear_env() {
    for key in [
        "SWARM_CONFIG_FILE",
        "CONTROL_PLANE_PORT",
        "ADMIN_PORT",
        "ADMIN_KEY",
        "SWARM_DB_PATH",
        "LOG_FILE",
        "STAGING_PATH",
        "BINHOST_PATH",
        "RELEASES_BASE",
        "PAYLOAD_DIR",
        "MAX_DRONE_FAILURES",
        "GROUNDING_TIMEOUT",
        "FAILURE_AGE_MINUTES",
        "QUEUE_TARGET",
        "CORES_PER_SLOT",
        "NODE_TIMEOUT",
        "STALE_TIMEOUT",
        "SWEEPER_PREFIX",
        "MAX_UPLOAD_FAILURES",
        "UPLOAD_RETRY_INTERVAL_M",
        "PROTECTED_HOSTS",
        "ENTRY_FAILURE_THRESHOLD",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
#[serial]
fn defaults_match_spec_table() {
    clear_env();
    let config = Config::load(None, None).unwrap();
    assert_eq!(config.control_plane_port, 8100);
    assert_eq!(config.admin_port, 8093);
    assert_eq!(config.max_drone_failures, 8);
    assert_eq!(config.queue_target, 5);
    assert_eq!(config.entry_failure_threshold, 5);
}

#[test]
#[serial]
fn env_vars_override_defaults() {
    clear_env();
    std::env::set_var("CONTROL_PLANE_PORT", "9100");
    std::env::set_var("PROTECTED_HOSTS", "host-a, host-b,host-c");
    let config = Config::load(None, None).unwrap();
    assert_eq!(config.control_plane_port, 9100);
    assert_eq!(config.protected_hosts, vec!["host-a", "host-b", "host-c"]);
    clear_env();
}

#[test]
#[serial]
fn cli_port_wins_over_env() {
    clear_env();
    std::env::set_var("CONTROL_PLANE_PORT", "9100");
    let config = Config::load(Some(8111), None).unwrap();
    assert_eq!(config.control_plane_port, 8111);
    clear_env();
}

#[test]
fn runtime_overrides_only_touch_known_scalar_fields() {
    let mut config = Config::defaults();
    let mut updates = HashMap::new();
    updates.insert("max_drone_failures".to_string(), serde_json::json!(20));
    updates.insert("unknown_field".to_string(), serde_json::json!("ignored"));
    apply_runtime_overrides(&mut config, &updates);
    assert_eq!(config.max_drone_failures, 20);
}
