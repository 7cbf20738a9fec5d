//! Domain error types.

use event_store::{EventStoreError, Version};
use thiserror::Error;

use crate::configuration::ConfigurationError;
use crate::environment::EnvironmentError;
use crate::layer::LayerError;
use crate::structure::StructureError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the event log.
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    /// A replayed event did not advance the aggregate version.
    #[error("Out of order event for {aggregate_type}: at version {current}, received {received}")]
    OutOfOrderEvent {
        aggregate_type: &'static str,
        current: Version,
        received: Version,
    },

    /// A snapshot was restored into the wrong aggregate type.
    #[error("Snapshot type mismatch: expected {expected}, found {found}")]
    SnapshotTypeMismatch {
        expected: &'static str,
        found: String,
    },

    /// A snapshot was written with an unknown serialization format.
    #[error("Unsupported snapshot schema for {aggregate_type}: expected {expected}, found {found}")]
    UnsupportedSchemaVersion {
        aggregate_type: &'static str,
        expected: i32,
        found: i32,
    },

    #[error("Environment error: {0}")]
    Environment(#[from] EnvironmentError),

    #[error("Layer error: {0}")]
    Layer(#[from] LayerError),

    #[error("Structure error: {0}")]
    Structure(#[from] StructureError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
