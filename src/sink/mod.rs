//! Data sink contract.
//!
//! The sink is the host-provided data table the engine writes sampled values
//! into. All calls are asynchronous round trips; the controller guarantees
//! value batches arrive exactly once, in ascending run order, scoped to a
//! host-confirmed experiment number.
//!
//! # Example
//!
//! ```rust
//! use tp_sampler::sink::{DataSink, MemorySink};
//!
//! # async fn example() -> tp_sampler::Result<()> {
//! let sink = MemorySink::new();
//! sink.start_experiment(1, 5).await?;
//! sink.add_values(1, vec!["a".to_string()], false).await?;
//! assert_eq!(sink.batches().len(), 1);
//! # Ok(())
//! # }
//! ```

mod memory;

pub use memory::{MemorySink, ValueBatch};

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::Result;

/// A host data context the collector device can sample from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    /// Context name, unique within the host document.
    pub name: String,
    /// Human-readable title.
    pub title: String,
}

/// Asynchronous contract with the host data table.
pub trait DataSink: Send + Sync {
    /// Open a new experiment, identified by `experiment_number`, expecting
    /// runs of `sample_size` draws. Value writes for the experiment must not
    /// happen before this call resolves.
    fn start_experiment(
        &self,
        experiment_number: u32,
        sample_size: u32,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Append one run's sampled values. `run_index` is 1-based and strictly
    /// ascending within an experiment.
    fn add_values(
        &self,
        run_index: u32,
        values: Vec<String>,
        collector: bool,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Delete every case the engine has written.
    fn delete_all(&self) -> impl Future<Output = Result<()>> + Send;

    /// List the host collections available to the collector device.
    fn get_contexts(&self) -> impl Future<Output = Result<Vec<Collection>>> + Send;

    /// Fetch the case values of one collection, in case order.
    fn cases_from_context(&self, collection: &str)
        -> impl Future<Output = Result<Vec<String>>> + Send;
}
