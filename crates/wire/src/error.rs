// SPDX-License-Identifier: MIT

//! The on-wire shape of an HTTP error response: every handler
//! that fails returns `{"error": "..."}` with no handler ever propagating an
//! unhandled exception to the transport layer.

use serde::{Deserialize, Serialize};
use sw_core::ErrorKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self { error: message.into() }
    }
}

impl From<&ErrorKind> for ErrorBody {
    fn from(kind: &ErrorKind) -> Self {
        ErrorBody::new(kind.to_string())
    }
}

/// Maps an [`ErrorKind`] to the HTTP status it is reported under. Lives in
/// `sw-wire` (not `sw-daemon`) so `sw-cli` can interpret the same status
/// codes without depending on axum.
pub fn status_code(kind: &ErrorKind) -> u16 {
    match kind {
        ErrorKind::StoreBusy => 500,
        ErrorKind::InvalidRequest(_) => 400,
        ErrorKind::NotFound(_) => 404,
        ErrorKind::Conflict(_) => 409,
        ErrorKind::Protected(_) => 403,
        ErrorKind::SshUnreachable | ErrorKind::SshTimeout | ErrorKind::SshError(_) => 502,
        ErrorKind::ValidationFailed(_) => 200,
        ErrorKind::Internal(_) => 500,
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
