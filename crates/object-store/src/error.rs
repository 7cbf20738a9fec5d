//! Object store error types.

use domain::DomainError;
use event_store::{EventStoreError, SnapshotStoreError};
use thiserror::Error;

/// Errors surfaced by the object store and the services built on it.
///
/// Failures of the event log or snapshot store are reported as
/// `StoreUnavailable`; only optimistic concurrency failures keep their own
/// variant so callers can retry them. Missing objects are not errors:
/// replays return the empty aggregate and queries an empty page.
#[derive(Debug, Error)]
pub enum ObjectStoreError {
    /// The stream was modified since the object was loaded.
    #[error("Concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    /// The event log or snapshot store failed.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A command was rejected by the aggregate.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The operation was cancelled before it completed.
    #[error("Operation cancelled")]
    Cancelled,
}

/// Result type for object store operations.
pub type Result<T> = std::result::Result<T, ObjectStoreError>;

impl From<EventStoreError> for ObjectStoreError {
    fn from(err: EventStoreError) -> Self {
        match err {
            EventStoreError::ConcurrencyConflict { .. } => Self::ConcurrencyConflict(err.to_string()),
            other => Self::StoreUnavailable(other.to_string()),
        }
    }
}

impl From<SnapshotStoreError> for ObjectStoreError {
    fn from(err: SnapshotStoreError) -> Self {
        Self::StoreUnavailable(err.to_string())
    }
}

impl From<DomainError> for ObjectStoreError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::EventStore(err) => err.into(),
            DomainError::Environment(_)
            | DomainError::Layer(_)
            | DomainError::Structure(_)
            | DomainError::Configuration(_) => Self::Validation(err.to_string()),
            other => Self::StoreUnavailable(other.to_string()),
        }
    }
}
