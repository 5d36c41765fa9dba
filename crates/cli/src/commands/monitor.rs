// SPDX-License-Identifier: MIT

//! `swarmctl monitor [--interval]` — polls `status` on an interval until
//! Ctrl-C.

use std::time::Duration;

use crate::client::SwarmClient;
use crate::commands::status;
use crate::exit_error::ExitError;
use crate::output::OutputFormat;

pub async fn run(client: &SwarmClient, interval_s: u64, format: OutputFormat) -> Result<(), ExitError> {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        if format == OutputFormat::Text {
            print!("\x1b[2J\x1b[H");
        }
        status::run(client, format).await?;

        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(interval_s)) => {}
            _ = &mut ctrl_c => return Ok(()),
        }
    }
}
