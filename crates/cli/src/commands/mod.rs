// SPDX-License-Identifier: MIT

//! `swarmctl` subcommand implementations.

pub mod control;
pub mod fleet;
pub mod history;
pub mod monitor;
pub mod queue;
pub mod status;
