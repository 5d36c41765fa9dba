// SPDX-License-Identifier: MIT

//! `swarmctl status` — a snapshot of the active session and queue counts.

use sw_wire::StatusResponse;

use crate::client::SwarmClient;
use crate::color;
use crate::exit_error::ExitError;
use crate::output::{format_or_json, OutputFormat};

pub async fn run(client: &SwarmClient, format: OutputFormat) -> Result<(), ExitError> {
    let status: StatusResponse = client.status().await?;
    format_or_json(format, &status, || print_text(&status)).map_err(|e| ExitError::operational(e.to_string()))
}

fn print_text(status: &StatusResponse) {
    let session_label = status.session.as_ref().map(|s| s.name.as_str()).unwrap_or("(none)");
    println!("{} {}", color::header("session:"), session_label);
    println!(
        "{} needed={} delegated={} received={} blocked={} failed={} (total={})",
        color::header("queue:"),
        status.needed,
        status.delegated,
        status.received,
        status.blocked,
        status.failed,
        status.total
    );
    println!(
        "{} {}",
        color::header("paused:"),
        if status.paused { color::warn("yes") } else { "no".to_string() }
    );
    println!(
        "{} {}/{} succeeded ({:.1}%)",
        color::header("history:"),
        status.timing.success,
        status.timing.total,
        status.timing.success_rate * 100.0
    );
    println!("{} {} drone(s) online", color::header("fleet:"), status.drones.len());
}
