// SPDX-License-Identifier: MIT

//! Activity feed: a 200-entry in-memory ring buffer backed by a persisted,
//! append-only log.

use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use parking_lot::Mutex;
use sw_core::{Event, EventType, NodeId};

use crate::error::StoreResult;

const RING_CAPACITY: usize = 200;

pub struct EventLog {
    path: PathBuf,
    ring: Mutex<VecDeque<Event>>,
}

impl EventLog {
    /// Opens the persisted log and hydrates the ring buffer from the most
    /// recent [`RING_CAPACITY`] rows (reverse order, then re-reversed), so
    /// restarts don't present an empty activity feed.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut recent: VecDeque<Event> = VecDeque::new();
        if path.exists() {
            let reader = BufReader::new(std::fs::File::open(&path)?);
            for line in reader.lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let event: Event = serde_json::from_str(&line)?;
                if recent.len() == RING_CAPACITY {
                    recent.pop_front();
                }
                recent.push_back(event);
            }
        }
        Ok(Self { path, ring: Mutex::new(recent) })
    }

    pub fn emit(&self, next_id: u64, event_type: EventType, message: impl Into<String>, detail: serde_json::Value, drone_id: Option<NodeId>, package: Option<String>, now_secs: i64) -> StoreResult<Event> {
        let event = Event {
            id: next_id,
            timestamp_secs: now_secs,
            event_type,
            message: message.into(),
            detail,
            drone_id,
            package,
        };
        let mut line = serde_json::to_vec(&event)?;
        line.push(b'\n');
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(&line)?;
        file.sync_data()?;

        let mut ring = self.ring.lock();
        if ring.len() == RING_CAPACITY {
            ring.pop_front();
        }
        ring.push_back(event.clone());
        Ok(event)
    }

    /// All entries newer than `since_id`, plus the latest id (long-poll friendly).
    pub fn since(&self, since_id: u64) -> (Vec<Event>, u64) {
        let ring = self.ring.lock();
        let events: Vec<Event> = ring.iter().filter(|e| e.id > since_id).cloned().collect();
        let latest = ring.back().map(|e| e.id).unwrap_or(since_id);
        (events, latest)
    }

    pub fn recent(&self, limit: usize) -> Vec<Event> {
        let ring = self.ring.lock();
        ring.iter().rev().take(limit).cloned().collect()
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
