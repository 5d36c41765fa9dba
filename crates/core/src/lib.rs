// SPDX-License-Identifier: MIT

//! sw-core: shared domain types, ids, and the `Clock` abstraction for the
//! build swarm control plane.

pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod health;
pub mod id;
pub mod node;
pub mod payload;
pub mod protocol;
pub mod queue;
pub mod release;
pub mod session;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::ConfigEntry;
pub use error::ErrorKind;
pub use event::{Event, EventType};
pub use health::{DroneHealth, ProbeChecks, ProbeResult, ProbeStatus};
pub use node::{Capabilities, MetricsSnapshot, Node, NodeId, NodeKind, NodeRegistration, NodeStatus};
pub use payload::{DronePayload, DronePayloadStatus, PayloadContent, PayloadVersion, INLINE_MAX_BYTES};
pub use protocol::{truncate_body, MessageType, ProtocolEntry, REQUEST_BODY_MAX, RESPONSE_BODY_MAX};
pub use queue::{BuildHistoryRow, CompletionStatus, QueueEntry, QueueEntryId, QueueStatus};
pub use release::{Release, ReleaseDiff, ReleaseId, ReleaseManifest, ReleaseStatus};
pub use session::{Session, SessionId, SessionStatus, SessionTotals};
