// SPDX-License-Identifier: MIT

//! Shared error kinds.
//!
//! Each crate layers its own `thiserror` enum over these where it needs
//! crate-specific variants; this is the vocabulary every layer agrees on
//! when mapping to an HTTP status in `sw-daemon`.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
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
}
