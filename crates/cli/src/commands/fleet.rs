// SPDX-License-Identifier: MIT

//! `swarmctl fleet` — lists registered drones and sweepers.

use sw_core::Node;

use crate::client::SwarmClient;
use crate::color;
use crate::exit_error::ExitError;
use crate::output::{handle_list, OutputFormat};

pub async fn run(client: &SwarmClient, all: bool, format: OutputFormat) -> Result<(), ExitError> {
    let nodes = client.fleet(all).await?;
    handle_list(format, &nodes.drones, "No drones registered.", print_text).map_err(|e| ExitError::operational(e.to_string()))
}

fn print_text(drones: &[Node]) {
    for node in drones {
        let status = if node.paused {
            color::warn("paused")
        } else {
            match node.status {
                sw_core::NodeStatus::Online => "online".to_string(),
                sw_core::NodeStatus::Offline => color::error("offline"),
            }
        };
        let task = node.current_task.as_deref().unwrap_or("-");
        println!(
            "{:<16} {:<16} {:<10} cores={:<4} task={}",
            color::header(&node.name),
            node.address,
            status,
            node.cores.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string()),
            task
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sw_core::{Capabilities, MetricsSnapshot, NodeId, NodeKind, NodeStatus};

    fn node(name: &str, status: NodeStatus, paused: bool) -> Node {
        Node {
            id: NodeId::from_string(format!("node-{name}")),
            name: name.to_string(),
            address: "10.0.0.1:9000".to_string(),
            secondary_address: None,
            kind: NodeKind::Drone,
            cores: Some(8),
            ram_mb: Some(16384),
            capabilities: Capabilities::default(),
            metrics: MetricsSnapshot::default(),
            current_task: None,
            version: None,
            last_seen_secs: 0,
            status,
            paused,
        }
    }

    #[test]
    fn print_text_handles_online_offline_and_paused_without_panicking() {
        let drones = vec![
            node("alpha", NodeStatus::Online, false),
            node("beta", NodeStatus::Offline, false),
            node("gamma", NodeStatus::Online, true),
        ];
        print_text(&drones);
    }

    #[test]
    fn print_text_handles_empty_slice() {
        print_text(&[]);
    }
}
