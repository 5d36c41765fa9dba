// SPDX-License-Identifier: MIT

//! Admin API: runs on its own port, gated by `X-Admin-Key`, and exposes
//! shutdown plus live config inspection/patching.

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::config;
use crate::coordinator::AppState;
use crate::error::ApiError;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/v1/shutdown", post(shutdown))
        .route("/admin/v1/config", get(get_config).post(patch_config))
        .layer(middleware::from_fn_with_state(state, require_admin_key))
}

async fn require_admin_key(State(state): State<AppState>, request: Request, next: Next) -> Result<Response, ApiError> {
    let config = state.config.lock().await;
    let Some(expected) = config.admin_key.as_deref() else {
        return Err(ApiError::Unauthorized);
    };
    let provided = request.headers().get("x-admin-key").and_then(|v| v.to_str().ok());
    if provided != Some(expected) {
        return Err(ApiError::Unauthorized);
    }
    drop(config);
    Ok(next.run(request).await)
}

async fn shutdown(State(state): State<AppState>) -> (StatusCode, &'static str) {
    tracing::warn!("shutdown requested via admin API");
    state.request_shutdown();
    (StatusCode::ACCEPTED, "shutting down")
}

async fn get_config(State(state): State<AppState>) -> Json<serde_json::Value> {
    let guard = state.config.lock().await;
    Json(config::to_json(&guard))
}

async fn patch_config(
    State(state): State<AppState>,
    Json(updates): Json<std::collections::HashMap<String, serde_json::Value>>,
) -> Json<serde_json::Value> {
    let mut guard = state.config.lock().await;
    config::apply_runtime_overrides(&mut guard, &updates);
    Json(config::to_json(&guard))
}
