// SPDX-License-Identifier: MIT

//! `sw-daemon`: the Coordinator HTTP server and its
//! background loops, wired together by [`coordinator::Coordinator`] —
//! the single value that owns every subcomponent.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod admin;
pub mod background;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod protocol_capture;
pub mod routes;

pub use coordinator::{AppState, Coordinator};
pub use error::{ApiError, DaemonError};
