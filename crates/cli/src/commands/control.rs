// SPDX-License-Identifier: MIT

//! `swarmctl control <action> [target]`.

use clap::ValueEnum;
use sw_core::NodeId;
use sw_wire::ControlAction as WireAction;

use crate::client::SwarmClient;
use crate::color;
use crate::exit_error::ExitError;
use crate::output::{format_or_json, OutputFormat};

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ControlActionArg {
    Pause,
    Resume,
    Unblock,
    Unground,
    Reset,
    Rebalance,
    ClearFailures,
    RetryFailures,
}

impl From<ControlActionArg> for WireAction {
    fn from(action: ControlActionArg) -> Self {
        match action {
            ControlActionArg::Pause => WireAction::Pause,
            ControlActionArg::Resume => WireAction::Resume,
            ControlActionArg::Unblock => WireAction::Unblock,
            ControlActionArg::Unground => WireAction::Unground,
            ControlActionArg::Reset => WireAction::Reset,
            ControlActionArg::Rebalance => WireAction::Rebalance,
            ControlActionArg::ClearFailures => WireAction::ClearFailures,
            ControlActionArg::RetryFailures => WireAction::RetryFailures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_arg_variant_maps_to_its_wire_counterpart() {
        assert_eq!(WireAction::from(ControlActionArg::Pause), WireAction::Pause);
        assert_eq!(WireAction::from(ControlActionArg::Resume), WireAction::Resume);
        assert_eq!(WireAction::from(ControlActionArg::Unblock), WireAction::Unblock);
        assert_eq!(WireAction::from(ControlActionArg::Unground), WireAction::Unground);
        assert_eq!(WireAction::from(ControlActionArg::Reset), WireAction::Reset);
        assert_eq!(WireAction::from(ControlActionArg::Rebalance), WireAction::Rebalance);
        assert_eq!(WireAction::from(ControlActionArg::ClearFailures), WireAction::ClearFailures);
        assert_eq!(WireAction::from(ControlActionArg::RetryFailures), WireAction::RetryFailures);
    }
}

pub async fn run(client: &SwarmClient, action: ControlActionArg, target: Option<String>, format: OutputFormat) -> Result<(), ExitError> {
    let drone_id = target.map(NodeId::from_string);
    let response = client.control(action.into(), drone_id).await?;
    format_or_json(format, &response, || {
        println!("{} {}", color::header("control:"), response.status);
        for (key, value) in &response.extra {
            println!("  {key}: {value}");
        }
    })
    .map_err(|e| ExitError::operational(e.to_string()))
}
