//! Experiment orchestration.
//!
//! ```text
//! VariableSet ──> Sequence ──> Scheduler ──> View
//!      │              │            │
//!      └──────── ExperimentController ──> DataSink (exact-order flush)
//!                      │
//!                 StateSync (capture/restore)
//! ```
//!
//! The controller owns the state machine; `state` holds the session value
//! and its enums, `snapshot` the persistence envelope.

mod controller;
mod snapshot;
mod state;

pub use controller::ExperimentController;
pub use snapshot::{PersistedSnapshot, SnapshotEnvelope};
pub use state::{Device, ExperimentState, Speed};
