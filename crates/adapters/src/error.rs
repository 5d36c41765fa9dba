// SPDX-License-Identifier: MIT

use thiserror::Error;

/// SSH helper outcomes as a sum type, per the re-architecture note in the
/// design notes: no helper throws, callers match on the kind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdapterError {
    #[error("ssh target unreachable")]
    Unreachable,
    #[error("ssh command timed out")]
    Timeout,
    #[error("ssh command failed: {0}")]
    Error(String),
    #[error("action refused: {0}")]
    Protected(String),
}

pub type AdapterResult<T> = Result<T, AdapterError>;
