// SPDX-License-Identifier: MIT

//! The durable Store.
//!
//! A single [`parking_lot::Mutex`] guards both the write-ahead log and the
//! materialized state: every operation — read or write — takes the lock for
//! the duration of its critical section. This trivially satisfies "readers
//! never observe torn writes" and "exactly one concurrent assigner wins";
//! lock hold times are kept to plain in-memory map operations, so
//! contention cost is comparable to the WAL-fsync cost alone.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use sw_core::{
    BuildHistoryRow, Capabilities, CompletionStatus, ConfigEntry, DroneHealth, MetricsSnapshot,
    Node, NodeId, NodeKind, NodeRegistration, NodeStatus, QueueEntry, QueueEntryId, QueueStatus,
    Release, ReleaseId, ReleaseStatus, Session, SessionId, SessionStatus, SessionTotals,
};

use crate::error::{StoreError, StoreResult};
use crate::state::{DronePayloadRow, MaterializedState, MetricsRow};
use crate::wal::{StoreOp, Wal};

struct Inner {
    wal: Wal,
    state: MaterializedState,
}

/// Thread-safe handle to the durable relational state. Cheap to clone
/// (internally an `Arc`-free single mutex — callers share `&Store` or wrap
/// it in `Arc<Store>` themselves, matching how the daemon shares it across
/// axum handlers).
pub struct Store {
    inner: Mutex<Inner>,
    path: PathBuf,
}

/// Result of a registration: whether this created a new node row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registered {
    Created,
    Updated,
}

/// Result of `complete_package`: what the queue entry transitioned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompleteOutcome {
    Received,
    ReturnedToNeeded,
    BlockedAfterFailures,
    Ignored,
}

impl Store {
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut state = Wal::load_checkpoint(&path)?.unwrap_or_default();
        Wal::replay(&path, |op| apply(&mut state, op))?;
        let wal = Wal::open(&path)?;
        Ok(Self { inner: Mutex::new(Inner { wal, state }), path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Compact the WAL into a checkpoint. Safe to call at any time; only
    /// shrinks the on-disk log, never changes observable state.
    pub fn checkpoint(&self) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        let state = inner.state.clone();
        inner.wal.checkpoint(&state)
    }

    /// Current on-disk size of the WAL file.
    pub fn wal_size_bytes(&self) -> StoreResult<u64> {
        self.inner.lock().wal.size_bytes()
    }

    fn commit(&self, inner: &mut Inner, op: StoreOp) -> StoreResult<()> {
        inner.wal.append(&op)?;
        apply(&mut inner.state, op);
        Ok(())
    }

    // ---------------------------------------------------------------
    // Nodes
    // ---------------------------------------------------------------

    /// Idempotent. If a different id already owns `name`, that row is
    /// deleted first.
    pub fn upsert_node(&self, reg: NodeRegistration, now_secs: i64) -> StoreResult<Registered> {
        let mut inner = self.inner.lock();
        if let Some(existing_id) = inner.state.node_by_name.get(&reg.name).copied() {
            if existing_id != reg.id {
                self.commit(&mut inner, StoreOp::RemoveNode(existing_id))?;
            }
        }
        let created = !inner.state.nodes.contains_key(&reg.id);
        let kind = reg.kind.unwrap_or(NodeKind::Drone);
        let node = Node {
            id: reg.id,
            name: reg.name,
            address: reg.address,
            secondary_address: reg.secondary_address,
            kind,
            cores: reg.cores,
            ram_mb: reg.ram_mb,
            capabilities: reg.capabilities,
            metrics: reg.metrics,
            current_task: reg.current_task,
            version: reg.version,
            last_seen_secs: now_secs,
            status: NodeStatus::Online,
            paused: inner.state.nodes.get(&reg.id).map(|n| n.paused).unwrap_or(false),
        };
        self.commit(&mut inner, StoreOp::UpsertNode(Box::new(node)))?;
        Ok(if created { Registered::Created } else { Registered::Updated })
    }

    pub fn get_node(&self, id: &NodeId) -> Option<Node> {
        self.inner.lock().state.nodes.get(id).cloned()
    }

    pub fn get_node_by_name(&self, name: &str) -> Option<Node> {
        let inner = self.inner.lock();
        let id = inner.state.node_by_name.get(name)?;
        inner.state.nodes.get(id).cloned()
    }

    pub fn get_all_nodes(&self, include_offline: bool, kind: Option<NodeKind>) -> Vec<Node> {
        let inner = self.inner.lock();
        let mut nodes: Vec<Node> = inner
            .state
            .nodes
            .values()
            .filter(|n| include_offline || n.status == NodeStatus::Online)
            .filter(|n| kind.map(|k| k == n.kind).unwrap_or(true))
            .cloned()
            .collect();
        nodes.sort_by(|a, b| a.name.cmp(&b.name));
        nodes
    }

    /// Marks offline all nodes with `last_seen < now - timeout`. Never deletes.
    pub fn update_node_status(&self, timeout_secs: i64, now_secs: i64) -> StoreResult<u64> {
        let mut inner = self.inner.lock();
        let stale: Vec<NodeId> = inner
            .state
            .nodes
            .values()
            .filter(|n| n.status == NodeStatus::Online && n.last_seen_secs < now_secs - timeout_secs)
            .map(|n| n.id)
            .collect();
        if stale.is_empty() {
            return Ok(0);
        }
        let count = stale.len() as u64;
        self.commit(&mut inner, StoreOp::MarkOffline { ids: stale })?;
        Ok(count)
    }

    pub fn set_node_paused(&self, id: NodeId, paused: bool) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        if !inner.state.nodes.contains_key(&id) {
            return Err(StoreError::NotFound(format!("node {id}")));
        }
        self.commit(&mut inner, StoreOp::SetNodePaused { id, paused })
    }

    pub fn remove_node(&self, id: NodeId) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        if !inner.state.nodes.contains_key(&id) {
            return Err(StoreError::NotFound(format!("node {id}")));
        }
        self.commit(&mut inner, StoreOp::RemoveNode(id))
    }

    // ---------------------------------------------------------------
    // Sessions
    // ---------------------------------------------------------------

    /// Starts a new active session; completes any existing active session
    /// first.
    pub fn start_session(&self, name: impl Into<String>, now_secs: i64) -> StoreResult<SessionId> {
        let mut inner = self.inner.lock();
        if let Some(active_id) = inner.state.active_session_id {
            if let Some(mut s) = inner.state.sessions.get(&active_id).cloned() {
                s.status = SessionStatus::Completed;
                s.completed_at_secs = Some(now_secs);
                self.commit(&mut inner, StoreOp::UpdateSession(Box::new(s)))?;
            }
        }
        let session = Session {
            id: SessionId::new(),
            name: name.into(),
            status: SessionStatus::Active,
            started_at_secs: now_secs,
            completed_at_secs: None,
            totals: SessionTotals::default(),
        };
        let id = session.id;
        self.commit(&mut inner, StoreOp::InsertSession(Box::new(session)))?;
        Ok(id)
    }

    pub fn get_active_session(&self) -> Option<Session> {
        let inner = self.inner.lock();
        inner.state.active_session_id.and_then(|id| inner.state.sessions.get(&id).cloned())
    }

    pub fn get_session(&self, id: &SessionId) -> Option<Session> {
        self.inner.lock().state.sessions.get(id).cloned()
    }

    pub fn complete_session(&self, id: SessionId, now_secs: i64) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        let mut session = inner
            .state
            .sessions
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("session {id}")))?;
        session.status = SessionStatus::Completed;
        session.completed_at_secs = Some(now_secs);
        self.commit(&mut inner, StoreOp::UpdateSession(Box::new(session)))
    }

    fn recompute_session_totals(inner: &mut Inner, session_id: SessionId) {
        let mut totals = SessionTotals::default();
        for e in inner.state.queue.values() {
            if e.session_id != Some(session_id) {
                continue;
            }
            match e.status {
                QueueStatus::Needed => totals.needed += 1,
                QueueStatus::Delegated => totals.delegated += 1,
                QueueStatus::Received => totals.received += 1,
                QueueStatus::Blocked => totals.blocked += 1,
                QueueStatus::Failed => totals.failed += 1,
            }
        }
        if let Some(mut s) = inner.state.sessions.get(&session_id).cloned() {
            s.totals = totals;
            // Direct mutation: totals are a derived cache, not worth a WAL
            // round-trip on every completion. Reconstructed identically on replay.
            inner.state.sessions.insert(session_id, s);
        }
    }

    // ---------------------------------------------------------------
    // Queue
    // ---------------------------------------------------------------

    /// Returns count added; duplicates against active-status entries with
    /// the same (atom, session) are dropped.
    pub fn queue_packages(
        &self,
        atoms: &[String],
        session_id: Option<SessionId>,
        now_secs: i64,
    ) -> StoreResult<u64> {
        let mut inner = self.inner.lock();
        let mut added = 0u64;
        for atom in atoms {
            let dup = inner.state.queue.values().any(|e| {
                e.atom == *atom && e.session_id == session_id && e.status.is_active()
            });
            if dup {
                continue;
            }
            let seq = inner.state.next_seq;
            let entry = QueueEntry::new(seq, atom.clone(), session_id);
            self.commit(&mut inner, StoreOp::InsertQueueEntry(Box::new(entry)))?;
            added += 1;
            let _ = now_secs;
        }
        if let Some(sid) = session_id {
            Self::recompute_session_totals(&mut inner, sid);
        }
        Ok(added)
    }

    /// Oldest-first by insertion sequence.
    pub fn get_needed_packages(&self, limit: usize, session_id: Option<SessionId>) -> Vec<QueueEntry> {
        let inner = self.inner.lock();
        let mut entries: Vec<QueueEntry> = inner
            .state
            .queue
            .values()
            .filter(|e| e.status == QueueStatus::Needed)
            .filter(|e| session_id.map(|s| e.session_id == Some(s)).unwrap_or(true))
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.seq);
        entries.truncate(limit);
        entries
    }

    pub fn get_blocked_packages(&self, limit: usize) -> Vec<QueueEntry> {
        let inner = self.inner.lock();
        let mut entries: Vec<QueueEntry> = inner
            .state
            .queue
            .values()
            .filter(|e| e.status == QueueStatus::Blocked)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.seq);
        entries.truncate(limit);
        entries
    }

    pub fn get_delegated_packages(&self) -> Vec<QueueEntry> {
        let inner = self.inner.lock();
        inner.state.queue.values().filter(|e| e.status == QueueStatus::Delegated).cloned().collect()
    }

    pub fn get_queue_entry(&self, id: &QueueEntryId) -> Option<QueueEntry> {
        self.inner.lock().state.queue.get(id).cloned()
    }

    pub fn get_queue_entry_by_atom(&self, atom: &str) -> Option<QueueEntry> {
        let inner = self.inner.lock();
        inner.state.queue.values().find(|e| e.atom == atom && e.status.is_active()).cloned()
    }

    pub fn queue_counts(&self, session_id: Option<SessionId>) -> SessionTotals {
        let inner = self.inner.lock();
        let mut totals = SessionTotals::default();
        for e in inner.state.queue.values() {
            if let Some(sid) = session_id {
                if e.session_id != Some(sid) {
                    continue;
                }
            }
            match e.status {
                QueueStatus::Needed => totals.needed += 1,
                QueueStatus::Delegated => totals.delegated += 1,
                QueueStatus::Received => totals.received += 1,
                QueueStatus::Blocked => totals.blocked += 1,
                QueueStatus::Failed => totals.failed += 1,
            }
        }
        totals
    }

    /// Conditional update; succeeds only when current status is `needed`.
    pub fn assign_package(&self, id: QueueEntryId, drone_id: NodeId, now_secs: i64) -> StoreResult<bool> {
        let mut inner = self.inner.lock();
        let Some(mut entry) = inner.state.queue.get(&id).cloned() else {
            return Ok(false);
        };
        if entry.status != QueueStatus::Needed {
            return Ok(false);
        }
        entry.status = QueueStatus::Delegated;
        entry.owner = Some(drone_id);
        entry.assigned_at_secs = Some(now_secs);
        let session_id = entry.session_id;
        self.commit(&mut inner, StoreOp::UpdateQueueEntry(Box::new(entry)))?;
        if let Some(sid) = session_id {
            Self::recompute_session_totals(&mut inner, sid);
        }
        Ok(true)
    }

    /// Conditional update; succeeds only when current status is `blocked`
    /// (used by the scheduler's sweeper path).
    pub fn assign_blocked_package(&self, id: QueueEntryId, drone_id: NodeId, now_secs: i64) -> StoreResult<bool> {
        let mut inner = self.inner.lock();
        let Some(mut entry) = inner.state.queue.get(&id).cloned() else {
            return Ok(false);
        };
        if entry.status != QueueStatus::Blocked {
            return Ok(false);
        }
        entry.status = QueueStatus::Delegated;
        entry.owner = Some(drone_id);
        entry.assigned_at_secs = Some(now_secs);
        self.commit(&mut inner, StoreOp::UpdateQueueEntry(Box::new(entry)))?;
        Ok(true)
    }

    /// Reassigns a delegated entry to a new owner without touching status
    /// (used by the scheduler's work-stealing path).
    pub fn reassign_package(&self, id: QueueEntryId, new_owner: NodeId, now_secs: i64) -> StoreResult<bool> {
        let mut inner = self.inner.lock();
        let Some(mut entry) = inner.state.queue.get(&id).cloned() else {
            return Ok(false);
        };
        if entry.status != QueueStatus::Delegated {
            return Ok(false);
        }
        entry.owner = Some(new_owner);
        entry.assigned_at_secs = Some(now_secs);
        self.commit(&mut inner, StoreOp::UpdateQueueEntry(Box::new(entry)))?;
        Ok(true)
    }

    pub fn is_package_assigned_to(&self, atom: &str, drone_id: &NodeId) -> bool {
        let inner = self.inner.lock();
        inner
            .state
            .queue
            .values()
            .any(|e| e.atom == atom && e.status == QueueStatus::Delegated && e.owner.as_ref() == Some(drone_id))
    }

    /// Updates the queue entry through its completion state machine,
    /// appends a BuildHistory row, and recomputes session counts — all
    /// under one lock hold, so a reader never observes the three
    /// half-updated.
    #[allow(clippy::too_many_arguments)]
    pub fn complete_package(
        &self,
        atom: &str,
        drone_id: NodeId,
        status: CompletionStatus,
        duration_s: Option<f64>,
        error: Option<String>,
        now_secs: i64,
        entry_failure_threshold: u32,
    ) -> StoreResult<CompleteOutcome> {
        let mut inner = self.inner.lock();

        let history_id = inner.state.next_history_id;
        let history = BuildHistoryRow {
            id: history_id,
            atom: atom.to_string(),
            drone_id,
            status,
            duration_s,
            error: error.clone(),
            recorded_at_secs: now_secs,
        };
        self.commit(&mut inner, StoreOp::AppendBuildHistory(Box::new(history)))?;

        let Some(mut entry) = inner
            .state
            .queue
            .values()
            .find(|e| e.atom == atom && e.status == QueueStatus::Delegated)
            .cloned()
        else {
            return Ok(CompleteOutcome::Ignored);
        };

        // Stale-completion guard: only the current owner's report mutates the entry.
        if entry.owner != Some(drone_id) {
            return Ok(CompleteOutcome::Ignored);
        }

        let session_id = entry.session_id;
        let outcome = match status {
            CompletionStatus::Success => {
                entry.status = QueueStatus::Received;
                entry.completed_at_secs = Some(now_secs);
                entry.owner = None;
                CompleteOutcome::Received
            }
            CompletionStatus::Returned => {
                entry.status = QueueStatus::Needed;
                entry.owner = None;
                entry.assigned_at_secs = None;
                CompleteOutcome::ReturnedToNeeded
            }
            CompletionStatus::Failed | CompletionStatus::MissingBinary | CompletionStatus::UploadFailed => {
                entry.failure_count += 1;
                entry.last_error = error;
                if entry.failure_count >= entry_failure_threshold {
                    entry.status = QueueStatus::Blocked;
                    entry.owner = None;
                    CompleteOutcome::BlockedAfterFailures
                } else {
                    entry.status = QueueStatus::Needed;
                    entry.owner = None;
                    entry.assigned_at_secs = None;
                    CompleteOutcome::ReturnedToNeeded
                }
            }
        };

        self.commit(&mut inner, StoreOp::UpdateQueueEntry(Box::new(entry)))?;
        if let Some(sid) = session_id {
            Self::recompute_session_totals(&mut inner, sid);
        }
        Ok(outcome)
    }

    pub fn reclaim_package(&self, atom: &str) -> StoreResult<bool> {
        let mut inner = self.inner.lock();
        let Some(mut entry) = inner
            .state
            .queue
            .values()
            .find(|e| e.atom == atom && e.status == QueueStatus::Delegated)
            .cloned()
        else {
            return Ok(false);
        };
        entry.status = QueueStatus::Needed;
        entry.owner = None;
        entry.assigned_at_secs = None;
        self.commit(&mut inner, StoreOp::UpdateQueueEntry(Box::new(entry)))?;
        Ok(true)
    }

    pub fn reclaim_package_by_id(&self, id: QueueEntryId) -> StoreResult<bool> {
        let mut inner = self.inner.lock();
        let Some(mut entry) = inner.state.queue.get(&id).cloned() else {
            return Ok(false);
        };
        if entry.status != QueueStatus::Delegated {
            return Ok(false);
        }
        entry.status = QueueStatus::Needed;
        entry.owner = None;
        entry.assigned_at_secs = None;
        self.commit(&mut inner, StoreOp::UpdateQueueEntry(Box::new(entry)))?;
        Ok(true)
    }

    pub fn unblock_all(&self) -> StoreResult<u64> {
        let mut inner = self.inner.lock();
        let ids: Vec<QueueEntryId> = inner
            .state
            .queue
            .values()
            .filter(|e| matches!(e.status, QueueStatus::Blocked | QueueStatus::Failed))
            .map(|e| e.id)
            .collect();
        let count = ids.len() as u64;
        for id in ids {
            if let Some(mut entry) = inner.state.queue.get(&id).cloned() {
                entry.status = QueueStatus::Needed;
                entry.failure_count = 0;
                self.commit(&mut inner, StoreOp::UpdateQueueEntry(Box::new(entry)))?;
            }
        }
        Ok(count)
    }

    pub fn unblock_package(&self, atom: &str) -> StoreResult<bool> {
        let mut inner = self.inner.lock();
        let Some(mut entry) = inner
            .state
            .queue
            .values()
            .find(|e| e.atom == atom && matches!(e.status, QueueStatus::Blocked | QueueStatus::Failed))
            .cloned()
        else {
            return Ok(false);
        };
        entry.status = QueueStatus::Needed;
        entry.failure_count = 0;
        self.commit(&mut inner, StoreOp::UpdateQueueEntry(Box::new(entry)))?;
        Ok(true)
    }

    /// All non-`received` rows -> needed; resets health counters.
    pub fn reset_queue(&self, session_id: Option<SessionId>) -> StoreResult<u64> {
        let mut inner = self.inner.lock();
        let ids: Vec<QueueEntryId> = inner
            .state
            .queue
            .values()
            .filter(|e| e.status != QueueStatus::Received)
            .filter(|e| session_id.map(|s| e.session_id == Some(s)).unwrap_or(true))
            .map(|e| e.id)
            .collect();
        let count = ids.len() as u64;
        for id in ids {
            if let Some(mut entry) = inner.state.queue.get(&id).cloned() {
                entry.status = QueueStatus::Needed;
                entry.owner = None;
                entry.assigned_at_secs = None;
                entry.failure_count = 0;
                self.commit(&mut inner, StoreOp::UpdateQueueEntry(Box::new(entry)))?;
            }
        }
        let node_ids: Vec<NodeId> = inner.state.nodes.keys().copied().collect();
        for id in node_ids {
            self.commit(&mut inner, StoreOp::UpsertDroneHealth { id, health: Box::new(DroneHealth::default()) })?;
        }
        Ok(count)
    }

    // ---------------------------------------------------------------
    // Build history / anti-repeat
    // ---------------------------------------------------------------

    pub fn get_build_history(&self, limit: usize, session_id: Option<SessionId>) -> Vec<BuildHistoryRow> {
        let inner = self.inner.lock();
        let mut rows: Vec<BuildHistoryRow> = inner
            .state
            .build_history
            .iter()
            .filter(|r| {
                session_id
                    .map(|sid| {
                        inner
                            .state
                            .queue
                            .values()
                            .any(|e| e.atom == r.atom && e.session_id == Some(sid))
                    })
                    .unwrap_or(true)
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.id.cmp(&a.id));
        rows.truncate(limit);
        rows
    }

    /// Scans BuildHistory; excludes upload failures (infrastructure, not
    /// package) and returns/success outcomes.
    pub fn has_drone_failed_package(&self, drone_id: &NodeId, atom: &str) -> bool {
        let inner = self.inner.lock();
        inner.state.build_history.iter().any(|r| {
            &r.drone_id == drone_id
                && r.atom == atom
                && !r.status.is_infrastructure_failure()
                && !r.status.is_success()
                && r.status != CompletionStatus::Returned
        })
    }

    pub fn count_distinct_drone_failures(&self, atom: &str) -> u64 {
        let inner = self.inner.lock();
        let mut drones = std::collections::HashSet::new();
        for r in inner.state.build_history.iter().filter(|r| {
            r.atom == atom
                && !r.status.is_infrastructure_failure()
                && !r.status.is_success()
                && r.status != CompletionStatus::Returned
        }) {
            drones.insert(r.drone_id);
        }
        drones.len() as u64
    }

    pub fn last_history_for_atom(&self, atom: &str) -> Option<BuildHistoryRow> {
        let inner = self.inner.lock();
        inner.state.build_history.iter().filter(|r| r.atom == atom).max_by_key(|r| r.id).cloned()
    }

    // ---------------------------------------------------------------
    // Drone health
    // ---------------------------------------------------------------

    pub fn get_drone_health(&self, id: &NodeId) -> DroneHealth {
        self.inner.lock().state.drone_health.get(id).cloned().unwrap_or_default()
    }

    pub fn record_drone_failure(&self, id: NodeId, now_secs: i64) -> StoreResult<DroneHealth> {
        let mut inner = self.inner.lock();
        let mut health = inner.state.drone_health.get(&id).cloned().unwrap_or_default();
        health.build_failure_count += 1;
        health.last_failure_secs = Some(now_secs);
        self.commit(&mut inner, StoreOp::UpsertDroneHealth { id, health: Box::new(health.clone()) })?;
        Ok(health)
    }

    pub fn reset_drone_health(&self, id: Option<NodeId>) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        let ids: Vec<NodeId> = match id {
            Some(id) => vec![id],
            None => inner.state.nodes.keys().copied().collect(),
        };
        for id in ids {
            self.commit(&mut inner, StoreOp::UpsertDroneHealth { id, health: Box::new(DroneHealth::default()) })?;
        }
        Ok(())
    }

    pub fn ground_drone(&self, id: NodeId, until_secs: i64) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        let mut health = inner.state.drone_health.get(&id).cloned().unwrap_or_default();
        health.grounded_until_secs = Some(until_secs);
        self.commit(&mut inner, StoreOp::UpsertDroneHealth { id, health: Box::new(health) })
    }

    pub fn mark_drone_rebooted(&self, id: NodeId) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        let mut health = inner.state.drone_health.get(&id).cloned().unwrap_or_default();
        health.rebooted = true;
        self.commit(&mut inner, StoreOp::UpsertDroneHealth { id, health: Box::new(health) })
    }

    pub fn record_upload_failure(&self, id: NodeId, now_secs: i64) -> StoreResult<DroneHealth> {
        let mut inner = self.inner.lock();
        let mut health = inner.state.drone_health.get(&id).cloned().unwrap_or_default();
        health.upload_failure_count += 1;
        health.last_upload_failure_secs = Some(now_secs);
        self.commit(&mut inner, StoreOp::UpsertDroneHealth { id, health: Box::new(health.clone()) })?;
        Ok(health)
    }

    pub fn reset_upload_failures(&self, id: NodeId) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        let mut health = inner.state.drone_health.get(&id).cloned().unwrap_or_default();
        health.upload_failure_count = 0;
        health.last_upload_failure_secs = None;
        self.commit(&mut inner, StoreOp::UpsertDroneHealth { id, health: Box::new(health) })
    }

    pub fn set_probe_result(&self, id: NodeId, result: sw_core::ProbeResult) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        let mut health = inner.state.drone_health.get(&id).cloned().unwrap_or_default();
        health.last_probe_result = Some(result);
        self.commit(&mut inner, StoreOp::UpsertDroneHealth { id, health: Box::new(health) })
    }

    // ---------------------------------------------------------------
    // Config
    // ---------------------------------------------------------------

    pub fn get_config(&self, key: &str) -> Option<ConfigEntry> {
        self.inner.lock().state.config.get(key).cloned()
    }

    pub fn set_config(&self, key: impl Into<String>, value: serde_json::Value, now_secs: i64) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        let entry = ConfigEntry { key: key.into(), value, updated_at_secs: now_secs };
        self.commit(&mut inner, StoreOp::SetConfig(entry))
    }

    pub fn all_config(&self) -> Vec<ConfigEntry> {
        let inner = self.inner.lock();
        let mut v: Vec<_> = inner.state.config.values().cloned().collect();
        v.sort_by(|a, b| a.key.cmp(&b.key));
        v
    }

    // ---------------------------------------------------------------
    // Metrics
    // ---------------------------------------------------------------

    pub fn log_metrics(&self, drone_id: Option<NodeId>, payload: serde_json::Value, now_secs: i64) -> StoreResult<u64> {
        let mut inner = self.inner.lock();
        let id = inner.state.next_metrics_id;
        let row = MetricsRow { id, recorded_at_secs: now_secs, drone_id, payload };
        self.commit(&mut inner, StoreOp::LogMetrics(row))?;
        Ok(id)
    }

    pub fn prune_old_metrics(&self, max_age_secs: i64, now_secs: i64) -> StoreResult<u64> {
        let mut inner = self.inner.lock();
        let before = now_secs - max_age_secs;
        let removed = inner.state.metrics.iter().filter(|m| m.recorded_at_secs < before).count() as u64;
        self.commit(&mut inner, StoreOp::PruneMetrics { before_secs: before })?;
        Ok(removed)
    }

    // ---------------------------------------------------------------
    // Releases (Store owns the row; filesystem work lives in sw-engine)
    // ---------------------------------------------------------------

    pub fn insert_release(&self, release: Release) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        self.commit(&mut inner, StoreOp::UpsertRelease(Box::new(release)))
    }

    pub fn update_release(&self, release: Release) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        self.commit(&mut inner, StoreOp::UpsertRelease(Box::new(release)))
    }

    pub fn get_release(&self, id: &ReleaseId) -> Option<Release> {
        self.inner.lock().state.releases.get(id).cloned()
    }

    pub fn get_release_by_version(&self, version: &str) -> Option<Release> {
        let inner = self.inner.lock();
        inner.state.releases.values().find(|r| r.version == version).cloned()
    }

    pub fn get_active_release(&self) -> Option<Release> {
        let inner = self.inner.lock();
        inner.state.releases.values().find(|r| r.status == ReleaseStatus::Active).cloned()
    }

    /// Most recently promoted archived release, for `rollback()`.
    pub fn get_last_archived_release(&self) -> Option<Release> {
        let inner = self.inner.lock();
        inner
            .state
            .releases
            .values()
            .filter(|r| r.status == ReleaseStatus::Archived)
            .max_by_key(|r| r.promoted_at_secs.unwrap_or(0))
            .cloned()
    }

    pub fn list_releases(&self) -> Vec<Release> {
        let inner = self.inner.lock();
        let mut v: Vec<_> = inner.state.releases.values().cloned().collect();
        v.sort_by_key(|r| r.created_at_secs);
        v
    }

    pub fn delete_release(&self, id: ReleaseId) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        self.commit(&mut inner, StoreOp::DeleteRelease(id))
    }

    // ---------------------------------------------------------------
    // Payload registry
    // ---------------------------------------------------------------

    pub fn append_payload_version(&self, version: sw_core::PayloadVersion) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        self.commit(&mut inner, StoreOp::AppendPayloadVersion(Box::new(version)))
    }

    pub fn latest_payload_version(&self, payload_type: &str) -> Option<sw_core::PayloadVersion> {
        let inner = self.inner.lock();
        inner
            .state
            .payload_versions
            .iter()
            .filter(|p| p.payload_type == payload_type)
            .max_by_key(|p| p.created_at_secs)
            .cloned()
    }

    pub fn list_payload_versions(&self, payload_type: &str) -> Vec<sw_core::PayloadVersion> {
        let inner = self.inner.lock();
        inner.state.payload_versions.iter().filter(|p| p.payload_type == payload_type).cloned().collect()
    }

    pub fn upsert_drone_payload(&self, row: DronePayloadRow) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        self.commit(&mut inner, StoreOp::UpsertDronePayload(row))
    }

    pub fn get_drone_payload(&self, drone_id: &NodeId, payload_type: &str) -> Option<DronePayloadRow> {
        let inner = self.inner.lock();
        inner.state.drone_payloads.get(&(*drone_id, payload_type.to_string())).cloned()
    }

    // ---------------------------------------------------------------
    // Monotonic id counters shared with events/protocol log
    // ---------------------------------------------------------------

    pub fn next_event_id(&self) -> u64 {
        let mut inner = self.inner.lock();
        let id = inner.state.next_event_id;
        self.commit(&mut inner, StoreOp::BumpEventId(id + 1)).ok();
        id
    }

    pub fn next_protocol_id(&self) -> u64 {
        let mut inner = self.inner.lock();
        let id = inner.state.next_protocol_id;
        self.commit(&mut inner, StoreOp::BumpProtocolId(id + 1)).ok();
        id
    }
}

/// Apply a single WAL op to the in-memory state. Pure and infallible: the op
/// was already validated by the `Store` method that produced it.
fn apply(state: &mut MaterializedState, op: StoreOp) {
    match op {
        StoreOp::UpsertNode(node) => {
            state.node_by_name.insert(node.name.clone(), node.id);
            state.nodes.insert(node.id, *node);
        }
        StoreOp::RemoveNode(id) => {
            if let Some(node) = state.nodes.remove(&id) {
                state.node_by_name.remove(&node.name);
            }
            state.drone_health.remove(&id);
        }
        StoreOp::MarkOffline { ids } => {
            for id in ids {
                if let Some(n) = state.nodes.get_mut(&id) {
                    n.status = NodeStatus::Offline;
                }
            }
        }
        StoreOp::SetNodePaused { id, paused } => {
            if let Some(n) = state.nodes.get_mut(&id) {
                n.paused = paused;
            }
        }
        StoreOp::InsertQueueEntry(entry) => {
            state.next_seq = state.next_seq.max(entry.seq + 1);
            state.queue.insert(entry.id, *entry);
        }
        StoreOp::UpdateQueueEntry(entry) => {
            state.queue.insert(entry.id, *entry);
        }
        StoreOp::InsertSession(session) => {
            state.active_session_id = Some(session.id);
            state.sessions.insert(session.id, *session);
        }
        StoreOp::UpdateSession(session) => {
            if session.status == SessionStatus::Completed && state.active_session_id == Some(session.id) {
                state.active_session_id = None;
            }
            state.sessions.insert(session.id, *session);
        }
        StoreOp::AppendBuildHistory(row) => {
            state.next_history_id = state.next_history_id.max(row.id + 1);
            state.build_history.push(*row);
        }
        StoreOp::UpsertDroneHealth { id, health } => {
            state.drone_health.insert(id, *health);
        }
        StoreOp::SetConfig(entry) => {
            state.config.insert(entry.key.clone(), entry);
        }
        StoreOp::LogMetrics(row) => {
            state.next_metrics_id = state.next_metrics_id.max(row.id + 1);
            state.metrics.push(row);
        }
        StoreOp::PruneMetrics { before_secs } => {
            state.metrics.retain(|m| m.recorded_at_secs >= before_secs);
        }
        StoreOp::UpsertRelease(release) => {
            if release.status == ReleaseStatus::Active {
                for r in state.releases.values_mut() {
                    if r.id != release.id && r.status == ReleaseStatus::Active {
                        r.status = ReleaseStatus::Archived;
                    }
                }
            }
            state.releases.insert(release.id, *release);
        }
        StoreOp::DeleteRelease(id) => {
            state.releases.remove(&id);
        }
        StoreOp::AppendPayloadVersion(version) => {
            state.payload_versions.push(*version);
        }
        StoreOp::UpsertDronePayload(row) => {
            state.drone_payloads.insert((row.drone_id, row.payload_type.clone()), row);
        }
        StoreOp::BumpEventId(next) => {
            state.next_event_id = state.next_event_id.max(next);
        }
        StoreOp::BumpProtocolId(next) => {
            state.next_protocol_id = state.next_protocol_id.max(next);
        }
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
