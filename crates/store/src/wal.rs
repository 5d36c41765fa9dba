// SPDX-License-Identifier: MIT

//! Write-ahead log of typed mutating operations.
//!
//! Every mutation to [`crate::state::MaterializedState`] is first appended
//! here (one JSON line per op, `fsync`ed before the in-memory state is
//! updated) so a crash between append and apply can never produce a torn
//! write: on restart the log is replayed from scratch (or from the most
//! recent zstd checkpoint) to rebuild the state.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sw_core::{
    ConfigEntry, DroneHealth, Node, NodeId, PayloadVersion, QueueEntry, QueueEntryId, Release,
    ReleaseId, Session, SessionId,
};

use crate::error::StoreResult;
use crate::state::{DronePayloadRow, MetricsRow};

/// One entry in the write-ahead log. Each variant mirrors a `Store`
/// mutating operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StoreOp {
    UpsertNode(Box<Node>),
    RemoveNode(NodeId),
    MarkOffline { ids: Vec<NodeId> },
    SetNodePaused { id: NodeId, paused: bool },

    InsertQueueEntry(Box<QueueEntry>),
    UpdateQueueEntry(Box<QueueEntry>),

    InsertSession(Box<Session>),
    UpdateSession(Box<Session>),

    AppendBuildHistory(Box<sw_core::BuildHistoryRow>),

    UpsertDroneHealth { id: NodeId, health: Box<DroneHealth> },

    SetConfig(ConfigEntry),

    LogMetrics(MetricsRow),
    PruneMetrics { before_secs: i64 },

    UpsertRelease(Box<Release>),
    DeleteRelease(ReleaseId),

    AppendPayloadVersion(Box<PayloadVersion>),
    UpsertDronePayload(DronePayloadRow),

    BumpEventId(u64),
    BumpProtocolId(u64),
}

pub struct Wal {
    path: PathBuf,
    file: File,
}

impl Wal {
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file })
    }

    pub fn append(&mut self, op: &StoreOp) -> StoreResult<()> {
        let mut line = serde_json::to_vec(op)?;
        line.push(b'\n');
        self.file.write_all(&line)?;
        self.file.sync_data()?;
        Ok(())
    }

    /// Replay all ops in the log, in order, passing each to `apply`.
    pub fn replay(path: impl AsRef<Path>, mut apply: impl FnMut(StoreOp)) -> StoreResult<()> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(());
        }
        let reader = BufReader::new(File::open(path)?);
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let op: StoreOp = serde_json::from_str(&line)?;
            apply(op);
        }
        Ok(())
    }

    /// Compact the log: write a zstd-compressed checkpoint of `state` and
    /// truncate the WAL, so future opens replay only ops since the
    /// checkpoint.
    pub fn checkpoint(&mut self, state: &crate::state::MaterializedState) -> StoreResult<()> {
        let checkpoint_path = self.path.with_extension("checkpoint.zst");
        let json = serde_json::to_vec(state)?;
        let compressed = zstd::encode_all(json.as_slice(), 3)
            .map_err(|e| crate::error::StoreError::Io(e))?;
        std::fs::write(&checkpoint_path, compressed)?;
        self.file = OpenOptions::new().create(true).write(true).truncate(true).open(&self.path)?;
        Ok(())
    }

    /// Current on-disk size of the WAL file, for the background compactor's
    /// size-threshold check.
    pub fn size_bytes(&self) -> StoreResult<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// Load a prior checkpoint, if one exists.
    pub fn load_checkpoint(
        path: impl AsRef<Path>,
    ) -> StoreResult<Option<crate::state::MaterializedState>> {
        let checkpoint_path = path.as_ref().with_extension("checkpoint.zst");
        if !checkpoint_path.exists() {
            return Ok(None);
        }
        let compressed = std::fs::read(&checkpoint_path)?;
        let json = zstd::decode_all(compressed.as_slice()).map_err(crate::error::StoreError::Io)?;
        Ok(Some(serde_json::from_slice(&json)?))
    }
}
