// SPDX-License-Identifier: MIT

//! Coordinator HTTP routes, grouped by subject matter
//! rather than one file per endpoint.

mod build;
mod health;
mod nodes;
mod protocol;

use axum::Router;

use crate::coordinator::AppState;

pub fn router() -> Router<AppState> {
    Router::new().merge(health::router()).merge(nodes::router()).merge(build::router()).merge(protocol::router())
}
