// SPDX-License-Identifier: MIT

//! sw-store: the durable Store plus Events & Protocol Log.

pub mod error;
pub mod events;
pub mod protocol;
pub mod state;
pub mod store;
mod wal;

pub use error::{StoreError, StoreResult};
pub use events::EventLog;
pub use protocol::ProtocolLog;
pub use state::{DronePayloadRow, MaterializedState, MetricsRow};
pub use store::{CompleteOutcome, Registered, Store};
pub use wal::StoreOp;
