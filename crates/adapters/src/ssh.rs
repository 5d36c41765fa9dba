// SPDX-License-Identifier: MIT

//! SSH probe/restart/reboot adapter.
//!
//! Per the design notes: commands are built as argv arrays (never shell
//! strings interpolated with node-supplied data), and the remote payload is
//! base64-encoded so the content can contain arbitrary bytes without
//! quoting concerns on either end.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use tokio::process::Command;
use tokio::time::timeout;

use crate::error::{AdapterError, AdapterResult};
use sw_core::{ProbeChecks, ProbeResult, ProbeStatus};

const PROBE_TIMEOUT: Duration = Duration::from_secs(15);
const RESTART_TIMEOUT: Duration = Duration::from_secs(30);
const REBOOT_TIMEOUT: Duration = Duration::from_secs(10);

const PROBE_SCRIPT: &str = r#"
PROC=$(pgrep -c swarm-drone 2>/dev/null || echo 0)
LOAD=$(cut -d' ' -f1 /proc/loadavg 2>/dev/null || echo 0)
DISK=$(df --output=pcent /var/cache/swarm 2>/dev/null | tail -1 | tr -dc '0-9')
EMERGE=$(pgrep -c emerge 2>/dev/null || echo 0)
UPTIME=$(cut -d. -f1 /proc/uptime 2>/dev/null || echo 0)
echo "PROC=$PROC"
echo "LOAD=$LOAD"
echo "DISK=${DISK:-0}"
echo "EMERGE=$EMERGE"
echo "UPTIME=$UPTIME"
"#;

/// Escalation ladder actions an adapter can carry out. Kept as a trait so
/// the daemon and scheduler never depend on the real `ssh` binary
/// directly, and tests substitute [`FakeSsh`].
#[async_trait]
pub trait SshAdapter: Send + Sync {
    async fn probe(&self, address: &str) -> AdapterResult<ProbeResult>;
    async fn restart_service(&self, address: &str) -> AdapterResult<()>;
    async fn kill_and_restart(&self, address: &str) -> AdapterResult<()>;
    async fn reboot_container(&self, address: &str, protected_hosts: &[String]) -> AdapterResult<()>;
}

pub struct RealSsh;

impl RealSsh {
    fn build_argv(address: &str, remote_script: &str) -> Vec<String> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(remote_script);
        vec![
            "ssh".to_string(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "ConnectTimeout=5".to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=no".to_string(),
            address.to_string(),
            "--".to_string(),
            format!("echo {encoded} | base64 -d | sh"),
        ]
    }

    async fn run(address: &str, script: &str, wall_clock: Duration) -> AdapterResult<String> {
        let argv = Self::build_argv(address, script);
        let mut cmd = Command::new(&argv[0]);
        cmd.args(&argv[1..]);
        let output = timeout(wall_clock, cmd.output()).await;
        let output = match output {
            Ok(Ok(out)) => out,
            Ok(Err(_)) => return Err(AdapterError::Unreachable),
            Err(_) => return Err(AdapterError::Timeout),
        };
        if !output.status.success() {
            return Err(AdapterError::Error(String::from_utf8_lossy(&output.stderr).trim().to_string()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

fn parse_probe_output(raw: &str) -> ProbeChecks {
    let mut checks = ProbeChecks::default();
    for line in raw.lines() {
        let Some((key, value)) = line.split_once('=') else { continue };
        match key.trim() {
            "PROC" => checks.proc_count = value.trim().parse().ok(),
            "LOAD" => checks.load_1m = value.trim().parse().ok(),
            "DISK" => checks.disk_percent = value.trim().parse().ok(),
            "EMERGE" => checks.emerge_count = value.trim().parse().ok(),
            "UPTIME" => checks.uptime_secs = value.trim().parse().ok(),
            _ => {}
        }
    }
    checks
}

/// Status classification, in priority order: service-down beats overload,
/// overload beats disk pressure.
pub fn classify(checks: &ProbeChecks) -> ProbeStatus {
    if checks.proc_count == Some(0) {
        return ProbeStatus::ServiceDown;
    }
    if checks.load_1m.unwrap_or(0.0) > 20.0 {
        return ProbeStatus::Overloaded;
    }
    if checks.disk_percent.unwrap_or(0.0) > 90.0 {
        return ProbeStatus::DiskFull;
    }
    ProbeStatus::Ok
}

#[async_trait]
impl SshAdapter for RealSsh {
    async fn probe(&self, address: &str) -> AdapterResult<ProbeResult> {
        let raw = Self::run(address, PROBE_SCRIPT, PROBE_TIMEOUT).await?;
        let checks = parse_probe_output(&raw);
        let status = classify(&checks);
        Ok(ProbeResult { status, checks })
    }

    async fn restart_service(&self, address: &str) -> AdapterResult<()> {
        let script = "rc-service swarm-drone restart 2>/dev/null || systemctl restart swarm-drone";
        Self::run(address, script, RESTART_TIMEOUT).await.map(|_| ())
    }

    async fn kill_and_restart(&self, address: &str) -> AdapterResult<()> {
        let script = "pkill -9 -f swarm-drone; sleep 1; rc-service swarm-drone start 2>/dev/null || systemctl start swarm-drone";
        Self::run(address, script, RESTART_TIMEOUT).await.map(|_| ())
    }

    async fn reboot_container(&self, address: &str, protected_hosts: &[String]) -> AdapterResult<()> {
        if protected_hosts.iter().any(|h| h == address) {
            return Err(AdapterError::Protected(format!("{address} is a protected host")));
        }
        // Fire-and-forget: the remote side disconnects us as it reboots, so a
        // non-zero/timeout result here is expected and not itself a failure
        // signal — the caller confirms recovery on the next probe instead.
        let _ = Self::run(address, "reboot", REBOOT_TIMEOUT).await;
        Ok(())
    }
}

/// Programmable fake for tests.
#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    #[derive(Default)]
    pub struct FakeSsh {
        pub probes: Mutex<HashMap<String, AdapterResult<ProbeResult>>>,
        pub restart_calls: Mutex<Vec<String>>,
        pub kill_restart_calls: Mutex<Vec<String>>,
        pub reboot_calls: Mutex<Vec<String>>,
    }

    impl FakeSsh {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_probe(&self, address: &str, result: AdapterResult<ProbeResult>) {
            self.probes.lock().insert(address.to_string(), result);
        }
    }

    #[async_trait]
    impl SshAdapter for FakeSsh {
        async fn probe(&self, address: &str) -> AdapterResult<ProbeResult> {
            self.probes.lock().get(address).cloned().unwrap_or_else(|| {
                Ok(ProbeResult { status: ProbeStatus::Ok, checks: ProbeChecks::default() })
            })
        }

        async fn restart_service(&self, address: &str) -> AdapterResult<()> {
            self.restart_calls.lock().push(address.to_string());
            Ok(())
        }

        async fn kill_and_restart(&self, address: &str) -> AdapterResult<()> {
            self.kill_restart_calls.lock().push(address.to_string());
            Ok(())
        }

        async fn reboot_container(&self, address: &str, protected_hosts: &[String]) -> AdapterResult<()> {
            if protected_hosts.iter().any(|h| h == address) {
                return Err(AdapterError::Protected(format!("{address} is a protected host")));
            }
            self.reboot_calls.lock().push(address.to_string());
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "ssh_tests.rs"]
mod tests;
