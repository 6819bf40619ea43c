//! In-memory sink implementation.
//!
//! The default backend when no host is attached: it records every call in
//! arrival order, which also makes it the reference observer for the
//! exactly-once, ascending-run-order delivery guarantee in tests.

use std::sync::{Mutex, PoisonError};

use super::{Collection, DataSink};
use crate::error::Error;
use crate::Result;

/// One recorded `add_values` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueBatch {
    /// 1-based run index the batch was filed under.
    pub run_index: u32,
    /// Sampled labels, in draw order.
    pub values: Vec<String>,
    /// Whether the batch came from the collector device.
    pub collector: bool,
}

#[derive(Debug, Default)]
struct SinkLog {
    experiments: Vec<(u32, u32)>,
    batches: Vec<ValueBatch>,
}

/// In-memory recording sink.
///
/// # Example
///
/// ```rust
/// use tp_sampler::sink::{DataSink, MemorySink};
///
/// # async fn example() -> tp_sampler::Result<()> {
/// let sink = MemorySink::new();
/// sink.start_experiment(1, 3).await?;
/// assert_eq!(sink.experiments(), vec![(1, 3)]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemorySink {
    log: Mutex<SinkLog>,
    contexts: Mutex<Vec<(Collection, Vec<String>)>>,
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemorySink {
    /// Create an empty sink with no host collections.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a host collection the collector device can sample from.
    pub fn add_context(&self, name: impl Into<String>, cases: Vec<String>) {
        let name = name.into();
        let collection = Collection {
            title: name.clone(),
            name,
        };
        lock(&self.contexts).push((collection, cases));
    }

    /// Every `start_experiment` call so far, as `(experiment_number,
    /// sample_size)` pairs in arrival order.
    #[must_use]
    pub fn experiments(&self) -> Vec<(u32, u32)> {
        lock(&self.log).experiments.clone()
    }

    /// Every `add_values` call so far, in arrival order.
    #[must_use]
    pub fn batches(&self) -> Vec<ValueBatch> {
        lock(&self.log).batches.clone()
    }

    /// Whether nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let log = lock(&self.log);
        log.experiments.is_empty() && log.batches.is_empty()
    }
}

impl DataSink for MemorySink {
    async fn start_experiment(&self, experiment_number: u32, sample_size: u32) -> Result<()> {
        lock(&self.log).experiments.push((experiment_number, sample_size));
        Ok(())
    }

    async fn add_values(&self, run_index: u32, values: Vec<String>, collector: bool) -> Result<()> {
        lock(&self.log).batches.push(ValueBatch {
            run_index,
            values,
            collector,
        });
        Ok(())
    }

    async fn delete_all(&self) -> Result<()> {
        let mut log = lock(&self.log);
        log.experiments.clear();
        log.batches.clear();
        Ok(())
    }

    async fn get_contexts(&self) -> Result<Vec<Collection>> {
        Ok(lock(&self.contexts).iter().map(|(c, _)| c.clone()).collect())
    }

    async fn cases_from_context(&self, collection: &str) -> Result<Vec<String>> {
        lock(&self.contexts)
            .iter()
            .find(|(c, _)| c.name == collection)
            .map(|(_, cases)| cases.clone())
            .ok_or_else(|| Error::UnknownCollection(collection.to_string()))
    }
}
