// SPDX-License-Identifier: MIT

//! Daemon-level errors: [`DaemonError`] for startup/config failures,
//! [`ApiError`] for the HTTP error kinds the control-plane routes return.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use sw_adapters::AdapterError;
use sw_core::ErrorKind;
use sw_engine::EngineError;
use sw_store::StoreError;
use sw_wire::ErrorBody;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("config error: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// HTTP-facing error kinds, with an extra `Unauthorized`
/// variant for the admin API's `X-Admin-Key` check, which has no
/// counterpart in [`ErrorKind`] since it is transport-layer, not
/// domain-layer.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("store busy")]
    StoreBusy,
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("action refused: {0}")]
    Protected(String),
    #[error("ssh target unreachable")]
    SshUnreachable,
    #[error("ssh command timed out")]
    SshTimeout,
    #[error("ssh command failed: {0}")]
    SshError(String),
    #[error("validation failed: {0}")]
    ValidationFailed(String),
    #[error("internal error: {0}")]
    Internal(String),
    #[error("unauthorized")]
    Unauthorized,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::StoreBusy => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Protected(_) => StatusCode::FORBIDDEN,
            ApiError::SshUnreachable | ApiError::SshTimeout | ApiError::SshError(_) => StatusCode::BAD_GATEWAY,
            // "not a failure": surfaced as 200 with the
            // downgraded completion status, never reaches this arm in
            // practice since handlers translate it before responding.
            ApiError::ValidationFailed(_) => StatusCode::OK,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if matches!(self, ApiError::Internal(_) | ApiError::StoreBusy) {
            tracing::error!(error = %self, "request failed");
        }
        let status = self.status();
        (status, Json(ErrorBody::new(self.to_string()))).into_response()
    }
}

impl From<&ErrorKind> for ApiError {
    fn from(kind: &ErrorKind) -> Self {
        match kind {
            ErrorKind::StoreBusy => ApiError::StoreBusy,
            ErrorKind::InvalidRequest(s) => ApiError::InvalidRequest(s.clone()),
            ErrorKind::NotFound(s) => ApiError::NotFound(s.clone()),
            ErrorKind::Conflict(s) => ApiError::Conflict(s.clone()),
            ErrorKind::Protected(s) => ApiError::Protected(s.clone()),
            ErrorKind::SshUnreachable => ApiError::SshUnreachable,
            ErrorKind::SshTimeout => ApiError::SshTimeout,
            ErrorKind::SshError(s) => ApiError::SshError(s.clone()),
            ErrorKind::ValidationFailed(s) => ApiError::ValidationFailed(s.clone()),
            ErrorKind::Internal(s) => ApiError::Internal(s.clone()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Busy => ApiError::StoreBusy,
            StoreError::NotFound(s) => ApiError::NotFound(s),
            StoreError::Conflict(s) => ApiError::Conflict(s),
            StoreError::Invalid(s) => ApiError::InvalidRequest(s),
            StoreError::Io(e) => ApiError::Internal(e.to_string()),
            StoreError::Serde(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Store(e) => e.into(),
            EngineError::ReleaseNotFound(s) => ApiError::NotFound(s),
            EngineError::ReleaseExists(s) => ApiError::Conflict(format!("release {s} already exists")),
            EngineError::CannotDeleteActive => ApiError::Conflict("cannot delete the active release".to_string()),
            EngineError::AlreadyMigrated => ApiError::Conflict("already migrated to release system".to_string()),
            EngineError::NoRollbackTarget => ApiError::NotFound("no archived release to roll back to".to_string()),
            EngineError::PayloadConflict(t, v) => ApiError::Conflict(format!("payload {t} v{v} already exists with different content")),
            EngineError::PayloadNotFound(t, v) => ApiError::NotFound(format!("payload {t} v{v}")),
            EngineError::Io(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<AdapterError> for ApiError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::Unreachable => ApiError::SshUnreachable,
            AdapterError::Timeout => ApiError::SshTimeout,
            AdapterError::Error(s) => ApiError::SshError(s),
            AdapterError::Protected(s) => ApiError::Protected(s),
        }
    }
}
