//! Startup and runtime errors of the service process.

use event_store::{EventStoreError, SnapshotStoreError};
use object_store::ObjectStoreError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("event log error: {0}")]
    EventStore(#[from] EventStoreError),

    #[error("snapshot store error: {0}")]
    SnapshotStore(#[from] SnapshotStoreError),

    #[error("object store error: {0}")]
    ObjectStore(#[from] ObjectStoreError),

    #[error("failed to install metrics exporter: {0}")]
    Metrics(String),

    #[error("snapshot service task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, ServiceError>;
