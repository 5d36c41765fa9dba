// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] sw_store::StoreError),
    #[error("release not found: {0}")]
    ReleaseNotFound(String),
    #[error("release {0} already exists")]
    ReleaseExists(String),
    #[error("cannot delete the active release")]
    CannotDeleteActive,
    #[error("binhost path already a symlink; refusing migration")]
    AlreadyMigrated,
    #[error("no release to roll back to")]
    NoRollbackTarget,
    #[error("payload {0} v{1} already exists with different content")]
    PayloadConflict(String, String),
    #[error("payload version not found: {0} v{1}")]
    PayloadNotFound(String, String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
