//! # TP-Sampler: Probability-Sampling Experiment Engine
//!
//! TP-Sampler runs randomized sampling experiments against a host data
//! platform: it generates draw sequences from a variable pool, animates them
//! step by step at a chosen pace (with pause/resume and mid-run speed
//! changes), synchronizes each completed run to an external data sink in
//! exact order, and captures/restores the full session configuration through
//! the host's persistence lifecycle.
//!
//! ## Guarantees
//!
//! - Sequence generation never precedes a host-confirmed experiment number.
//! - Each run is flushed to the sink exactly once, in ascending run order.
//! - Pausing freezes the run/draw pointer exactly; no draw is skipped or
//!   repeated across a resume.
//! - At most one sequence is live at a time (Idle-only start guard plus a
//!   stale-response check on the create-experiment round trip).
//!
//! ## Example
//!
//! ```rust
//! use tp_sampler::experiment::{ExperimentController, Speed};
//! use tp_sampler::sink::MemorySink;
//! use tp_sampler::view::NullView;
//!
//! # async fn example() {
//! let controller = ExperimentController::new(MemorySink::new(), NullView);
//! controller.set_sample_size(5);
//! controller.set_num_runs(3);
//!
//! // Instant speed flushes the whole experiment synchronously.
//! controller.change_speed(Speed::Instant).await;
//! controller.start().await;
//! assert_eq!(controller.sink().batches().len(), 3);
//! # }
//! ```
//!
//! For timed speeds, call [`experiment::ExperimentController::start`] and
//! then pace the sequence with [`experiment::ExperimentController::drive`];
//! `pause`, `resume`, `change_speed` and `stop` may be called concurrently
//! with the drive loop.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod error;
pub mod events;
pub mod experiment;
pub mod scheduler;
pub mod sequence;
pub mod sink;
pub mod variables;
pub mod view;

pub use error::{Error, Result};
