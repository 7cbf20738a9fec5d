//! Append-only event log and snapshot storage.
//!
//! The log is a single global sequence: every event receives a strictly
//! increasing position, and the version of a stream is the position of its
//! last event. Snapshots are stored separately behind [`SnapshotStore`].

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod snapshot;
pub mod store;

pub use error::{EventStoreError, Result, SnapshotStoreError};
pub use event::{EventId, EventMetadata, NewEvent, NewEventBuilder, StoredEvent, Version};
pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use query::{DEFAULT_BATCH_SIZE, Direction, EventQuery};
pub use snapshot::{
    DomainObjectSnapshot, FileSnapshotStore, InMemorySnapshotStore, PostgresSnapshotStore,
    SnapshotResult, SnapshotStore, SnapshotStoreConfig, SqliteSnapshotStore,
};
pub use store::{AppendOptions, EventStore, EventStoreExt, EventStream};
