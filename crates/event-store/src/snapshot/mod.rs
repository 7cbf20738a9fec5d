//! Durable, versioned serializations of aggregate state.
//!
//! Several snapshots of the same object may coexist at different versions;
//! readers pick the newest one not exceeding the version they need and
//! replay the remaining events on top of it.

mod config;
mod file;
mod memory;
mod postgres;
mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{SnapshotStoreError, Version};

pub use config::SnapshotStoreConfig;
pub use file::FileSnapshotStore;
pub use memory::InMemorySnapshotStore;
pub use postgres::PostgresSnapshotStore;
pub use sqlite::SqliteSnapshotStore;

/// Result type for snapshot store operations.
pub type SnapshotResult<T> = std::result::Result<T, SnapshotStoreError>;

/// A snapshot of one domain object at a specific version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainObjectSnapshot {
    /// The aggregate type (e.g., "ConfigEnvironment").
    pub data_type: String,

    /// Stream key of the object.
    pub identifier: String,

    /// The serialized aggregate state. Opaque to every backend.
    pub serialized_state: String,

    /// The aggregate version this snapshot represents.
    pub object_version: Version,

    /// Version of the serialization format of `serialized_state`.
    pub schema_version: i32,
}

impl DomainObjectSnapshot {
    /// Creates a snapshot by serializing `state`.
    pub fn from_state<T: Serialize>(
        data_type: impl Into<String>,
        identifier: impl Into<String>,
        object_version: Version,
        schema_version: i32,
        state: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            data_type: data_type.into(),
            identifier: identifier.into(),
            serialized_state: serde_json::to_string(state)?,
            object_version,
            schema_version,
        })
    }

    /// Deserializes the snapshot state into a concrete type.
    pub fn to_state<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.serialized_state)
    }
}

/// Storage for domain object snapshots.
///
/// Every backend implements the same contract and passes the same test
/// suite; the backend is chosen at startup with [`SnapshotStoreConfig`].
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Stores snapshots, replacing any existing snapshot with the same
    /// type, identifier and object version.
    async fn save_snapshots(&self, snapshots: Vec<DomainObjectSnapshot>) -> SnapshotResult<()>;

    /// Retrieves the newest snapshot of an object.
    ///
    /// Returns None if no snapshot exists.
    async fn get_snapshot(
        &self,
        data_type: &str,
        identifier: &str,
    ) -> SnapshotResult<Option<DomainObjectSnapshot>>;

    /// Retrieves the snapshot with the greatest object version not exceeding
    /// `max_version`.
    ///
    /// Returns None if every snapshot of the object is newer, or none exist.
    async fn get_snapshot_at(
        &self,
        data_type: &str,
        identifier: &str,
        max_version: Version,
    ) -> SnapshotResult<Option<DomainObjectSnapshot>>;

    /// Returns the highest object version across all snapshots, 0 if empty.
    async fn get_latest_snapshot_numbers(&self) -> SnapshotResult<i64>;
}
