use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{DomainObjectSnapshot, SnapshotResult, SnapshotStore};
use crate::Version;

/// Snapshots grouped by `(data_type, identifier)` and ordered by version.
#[derive(Debug, Default)]
pub(crate) struct SnapshotIndex {
    objects: HashMap<(String, String), BTreeMap<Version, DomainObjectSnapshot>>,
}

impl SnapshotIndex {
    pub(crate) fn insert(&mut self, snapshot: DomainObjectSnapshot) {
        self.objects
            .entry((snapshot.data_type.clone(), snapshot.identifier.clone()))
            .or_default()
            .insert(snapshot.object_version, snapshot);
    }

    pub(crate) fn latest(&self, data_type: &str, identifier: &str) -> Option<DomainObjectSnapshot> {
        self.versions(data_type, identifier)?
            .values()
            .next_back()
            .cloned()
    }

    pub(crate) fn at_or_below(
        &self,
        data_type: &str,
        identifier: &str,
        max_version: Version,
    ) -> Option<DomainObjectSnapshot> {
        self.versions(data_type, identifier)?
            .range(..=max_version)
            .next_back()
            .map(|(_, snapshot)| snapshot.clone())
    }

    pub(crate) fn highest_version(&self) -> i64 {
        self.objects
            .values()
            .filter_map(|versions| versions.keys().next_back())
            .map(|v| v.as_i64())
            .max()
            .unwrap_or(0)
    }

    pub(crate) fn len(&self) -> usize {
        self.objects.values().map(BTreeMap::len).sum()
    }

    fn versions(
        &self,
        data_type: &str,
        identifier: &str,
    ) -> Option<&BTreeMap<Version, DomainObjectSnapshot>> {
        self.objects
            .get(&(data_type.to_string(), identifier.to_string()))
    }
}

/// In-memory snapshot store for tests and single-process deployments.
#[derive(Clone, Default)]
pub struct InMemorySnapshotStore {
    index: Arc<RwLock<SnapshotIndex>>,
}

impl InMemorySnapshotStore {
    /// Creates a new empty in-memory snapshot store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored snapshots.
    pub async fn snapshot_count(&self) -> usize {
        self.index.read().await.len()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn save_snapshots(&self, snapshots: Vec<DomainObjectSnapshot>) -> SnapshotResult<()> {
        let mut index = self.index.write().await;
        for snapshot in snapshots {
            index.insert(snapshot);
        }
        Ok(())
    }

    async fn get_snapshot(
        &self,
        data_type: &str,
        identifier: &str,
    ) -> SnapshotResult<Option<DomainObjectSnapshot>> {
        Ok(self.index.read().await.latest(data_type, identifier))
    }

    async fn get_snapshot_at(
        &self,
        data_type: &str,
        identifier: &str,
        max_version: Version,
    ) -> SnapshotResult<Option<DomainObjectSnapshot>> {
        Ok(self
            .index
            .read()
            .await
            .at_or_below(data_type, identifier, max_version))
    }

    async fn get_latest_snapshot_numbers(&self) -> SnapshotResult<i64> {
        Ok(self.index.read().await.highest_version())
    }
}
