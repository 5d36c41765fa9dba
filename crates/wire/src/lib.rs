// SPDX-License-Identifier: MIT

//! The Coordinator HTTP wire format: request/response DTOs
//! for every endpoint, query-string shapes, and the `(method, path)` →
//! [`sw_core::MessageType`] classifier consumed by the protocol log.

mod classify;
mod error;
mod request;
mod response;
mod query;

pub use classify::{classify_message, normalize_path};
pub use error::{status_code, ErrorBody};
pub use request::{CompleteRequest, ControlAction, ControlRequest, QueueRequest, RegisterRequest};
pub use response::{
    BuildStats, CompleteResponse, ControlResponse, DelegatedEntry, DroneStatusEntry,
    EventsResponse, HealthResponse, HistoryResponse, NodePauseResponse, NodesResponse,
    OrchestratorResponse, PackageLists, ProtocolDensityResponse, ProtocolQueryResponse,
    ProtocolSnapshotResponse, ProtocolStatsResponse, ProtocolStatsRow, QueueResponse,
    RegisterResponse, StatusResponse, WorkResponse,
};
pub use query::{
    EventsQuery, HistoryQuery, NodesQuery, ProtocolDensityQuery, ProtocolDetailQuery,
    ProtocolQuery, ProtocolSnapshotQuery, ProtocolStatsQuery, WorkQuery,
};
