// SPDX-License-Identifier: MIT

//! `swarmctl history` — recent build completions.

use sw_core::BuildHistoryRow;

use crate::client::SwarmClient;
use crate::color;
use crate::exit_error::ExitError;
use crate::output::{handle_list, OutputFormat};

pub async fn run(client: &SwarmClient, limit: Option<usize>, session: Option<String>, format: OutputFormat) -> Result<(), ExitError> {
    let history = client.history(limit, session).await?;
    handle_list(format, &history.history, "No build history yet.", print_text).map_err(|e| ExitError::operational(e.to_string()))
}

fn print_text(rows: &[BuildHistoryRow]) {
    for row in rows {
        let status = if row.status.is_success() { row.atom.clone() } else { color::error(&row.atom) };
        let duration = row.duration_s.map(|d| format!("{d:.1}s")).unwrap_or_else(|| "-".to_string());
        println!("{:<8} {:?} {:<10} {}", row.drone_id, row.status, duration, status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sw_core::{CompletionStatus, NodeId};

    fn row(atom: &str, status: CompletionStatus, duration_s: Option<f64>) -> BuildHistoryRow {
        BuildHistoryRow {
            id: 1,
            atom: atom.to_string(),
            drone_id: NodeId::from_string("node-1"),
            status,
            duration_s,
            error: None,
            recorded_at_secs: 0,
        }
    }

    #[test]
    fn print_text_handles_success_and_failure_rows_without_panicking() {
        let rows = vec![
            row("dev-libs/foo-1.0", CompletionStatus::Success, Some(12.5)),
            row("dev-libs/bar-2.0", CompletionStatus::Failed, None),
            row("dev-libs/baz-3.0", CompletionStatus::UploadFailed, Some(3.25)),
        ];
        print_text(&rows);
    }

    #[test]
    fn print_text_handles_empty_slice() {
        print_text(&[]);
    }
}
