//! Error types for the sampler engine.
//!
//! Sink failures are caught at the controller boundary and logged; they never
//! propagate into the experiment state machine. The variants here exist for
//! sink implementations and for snapshot decoding.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Sampler engine error types
#[derive(Error, Debug)]
pub enum Error {
    /// Data sink call failed (network or host error)
    #[error("Data sink error: {0}")]
    Sink(String),

    /// Requested host collection does not exist
    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    /// Persistence envelope could not be decoded
    #[error("Snapshot decode error: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
