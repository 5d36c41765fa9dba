// SPDX-License-Identifier: MIT

//! Wireshark-style protocol capture.
//!
//! Handlers push a fully-built [`ProtocolEntry`] into a bounded in-memory
//! queue and return immediately — `try_push` never blocks and silently
//! drops on a full queue, keeping the hot path's cost to the allocation of
//! the entry itself. A single background flusher drains the queue in
//! batches; call [`ProtocolLog::flush`] from a ticker to do that work.

use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use parking_lot::Mutex;
use sw_core::ProtocolEntry;

use crate::error::StoreResult;

const QUEUE_CAPACITY: usize = 5000;

pub struct ProtocolLog {
    path: PathBuf,
    pending: Mutex<VecDeque<ProtocolEntry>>,
    persisted: Mutex<Vec<ProtocolEntry>>,
    dropped: std::sync::atomic::AtomicU64,
}

impl ProtocolLog {
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut persisted = Vec::new();
        if path.exists() {
            let reader = BufReader::new(std::fs::File::open(&path)?);
            for line in reader.lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                persisted.push(serde_json::from_str(&line)?);
            }
        }
        Ok(Self { path, pending: Mutex::new(VecDeque::new()), persisted: Mutex::new(persisted), dropped: std::sync::atomic::AtomicU64::new(0) })
    }

    /// Never blocks. Returns `false` (and increments the drop counter) if
    /// the queue is full; `ProtocolQuery` entries must never reach here —
    /// enforced by the caller classifying before pushing.
    pub fn try_push(&self, entry: ProtocolEntry) -> bool {
        let mut pending = self.pending.lock();
        if pending.len() >= QUEUE_CAPACITY {
            self.dropped.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            return false;
        }
        pending.push_back(entry);
        true
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(std::sync::atomic::Ordering::Relaxed)
    }

    /// Drains all currently-pending entries to disk in one multi-line write
    /// and appends them to the in-memory queryable set. Called every 500ms
    /// by the daemon's background writer, and once more on shutdown to
    /// drain the queue before exit.
    pub fn flush(&self) -> StoreResult<usize> {
        let batch: Vec<ProtocolEntry> = {
            let mut pending = self.pending.lock();
            pending.drain(..).collect()
        };
        if batch.is_empty() {
            return Ok(0);
        }
        let mut buf = Vec::new();
        for entry in &batch {
            serde_json::to_writer(&mut buf, entry)?;
            buf.push(b'\n');
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(&buf)?;
        file.sync_data()?;
        let n = batch.len();
        self.persisted.lock().extend(batch);
        Ok(n)
    }

    pub fn prune_older_than(&self, cutoff_secs: i64) -> usize {
        let mut persisted = self.persisted.lock();
        let before = persisted.len();
        persisted.retain(|e| e.timestamp_secs >= cutoff_secs);
        before - persisted.len()
    }

    #[allow(clippy::too_many_arguments)]
    pub fn query(
        &self,
        since_id: u64,
        message_type: Option<sw_core::MessageType>,
        drone: Option<&str>,
        package: Option<&str>,
        min_latency_ms: Option<u64>,
        limit: usize,
    ) -> Vec<ProtocolEntry> {
        let persisted = self.persisted.lock();
        let mut out: Vec<ProtocolEntry> = persisted
            .iter()
            .filter(|e| e.id > since_id)
            .filter(|e| message_type.map(|t| t == e.message_type).unwrap_or(true))
            .filter(|e| {
                drone
                    .map(|d| e.resolved_node_name.as_deref() == Some(d) || e.drone_id.as_ref().map(|id| id.as_str()) == Some(d))
                    .unwrap_or(true)
            })
            .filter(|e| package.map(|p| e.package.as_deref() == Some(p)).unwrap_or(true))
            .filter(|e| min_latency_ms.map(|m| e.latency_ms >= m).unwrap_or(true))
            .cloned()
            .collect();
        out.sort_by_key(|e| e.id);
        out.truncate(limit);
        out
    }

    pub fn detail(&self, id: u64) -> Option<ProtocolEntry> {
        self.persisted.lock().iter().find(|e| e.id == id).cloned()
    }

    pub fn stats(&self, since_id: u64) -> Vec<(sw_core::MessageType, u64, f64)> {
        use std::collections::HashMap;
        let persisted = self.persisted.lock();
        let mut agg: HashMap<sw_core::MessageType, (u64, u64)> = HashMap::new();
        for e in persisted.iter().filter(|e| e.id > since_id) {
            let slot = agg.entry(e.message_type).or_insert((0, 0));
            slot.0 += 1;
            slot.1 += e.latency_ms;
        }
        agg.into_iter().map(|(t, (count, total))| (t, count, total as f64 / count as f64)).collect()
    }

    /// Length-`buckets` histogram of entry counts over `[start, end]`.
    pub fn activity_density(&self, start: i64, end: i64, buckets: usize) -> Vec<u64> {
        let mut hist = vec![0u64; buckets.max(1)];
        if end <= start || buckets == 0 {
            return hist;
        }
        let span = (end - start) as f64;
        let persisted = self.persisted.lock();
        for e in persisted.iter().filter(|e| e.timestamp_secs >= start && e.timestamp_secs <= end) {
            let frac = (e.timestamp_secs - start) as f64 / span;
            let idx = ((frac * buckets as f64) as usize).min(buckets - 1);
            hist[idx] += 1;
        }
        hist
    }

    /// Response bodies of the most recent `status_query` and `node_list`
    /// entries with `timestamp <= at`.
    pub fn state_at_time(&self, at: i64) -> (Option<String>, Option<String>) {
        let persisted = self.persisted.lock();
        let status = persisted
            .iter()
            .filter(|e| e.message_type == sw_core::MessageType::StatusQuery && e.timestamp_secs <= at)
            .max_by_key(|e| e.timestamp_secs)
            .and_then(|e| e.response_body.clone());
        let nodes = persisted
            .iter()
            .filter(|e| e.message_type == sw_core::MessageType::NodeList && e.timestamp_secs <= at)
            .max_by_key(|e| e.timestamp_secs)
            .and_then(|e| e.response_body.clone());
        (status, nodes)
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
