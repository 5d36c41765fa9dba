// SPDX-License-Identifier: MIT

//! `swarmctl queue add <atoms>` / `swarmctl queue list`.

use crate::client::SwarmClient;
use crate::color;
use crate::exit_error::ExitError;
use crate::output::{format_or_json, OutputFormat};

pub async fn add(client: &SwarmClient, packages: Vec<String>, format: OutputFormat) -> Result<(), ExitError> {
    if packages.is_empty() {
        return Err(ExitError::new(2, "queue add requires at least one package atom"));
    }
    let response = client.queue_add(packages).await?;
    format_or_json(format, &response, || {
        println!("{} queued {} package(s)", color::header("queue:"), response.queued);
    })
    .map_err(|e| ExitError::operational(e.to_string()))
}

pub async fn list(client: &SwarmClient, format: OutputFormat) -> Result<(), ExitError> {
    let status = client.status().await?;
    format_or_json(format, &status.packages, || {
        println!("{} {}", color::header("needed:"), status.packages.needed.len());
        for atom in &status.packages.needed {
            println!("  {atom}");
        }
        println!("{} {}", color::header("delegated:"), status.packages.delegated.len());
        for (atom, entry) in &status.packages.delegated {
            let owner = entry.drone.as_ref().map(|d| d.to_string()).unwrap_or_else(|| "-".to_string());
            println!("  {atom} -> {owner}");
        }
        println!("{} {}", color::header("blocked:"), status.packages.blocked.len());
        for atom in &status.packages.blocked {
            println!("  {}", color::error(atom));
        }
    })
    .map_err(|e| ExitError::operational(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_rejects_empty_package_list_without_a_network_call() {
        let client = SwarmClient::new("http://127.0.0.1:1");
        let err = add(&client, Vec::new(), OutputFormat::Text).await.unwrap_err();
        assert_eq!(err.code, 2);
    }
}
