use thiserror::Error;

use crate::Version;

/// Errors that can occur when interacting with the event log.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// A concurrency conflict occurred when appending events.
    /// The expected version did not match the stream's current version.
    #[error(
        "Concurrency conflict for stream {identifier}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        identifier: String,
        expected: Version,
        actual: Version,
    },

    /// The batch of events handed to `append` was malformed.
    #[error("Invalid append: {0}")]
    InvalidAppend(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for event log operations.
pub type Result<T> = std::result::Result<T, EventStoreError>;

/// Errors raised by snapshot store backends.
#[derive(Debug, Error)]
pub enum SnapshotStoreError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored snapshot record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The file backend failed to read or write its data file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend configuration is incomplete or unknown.
    #[error("Invalid snapshot store configuration: {0}")]
    Configuration(String),
}
