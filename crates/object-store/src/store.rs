//! Aggregate reconstruction from cache, snapshots and the event log.

use std::sync::Arc;

use common::{Identifier, ListScope};
use domain::{Aggregate, ReplayedEvent};
use event_store::{EventStore, SnapshotStore, Version};
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::cache::ObjectCache;
use crate::config::ObjectStoreConfig;
use crate::error::{ObjectStoreError, Result};

/// Reconstructs aggregates at the latest or at a bounded version.
///
/// A replay starts from the best available base, which is a cached copy,
/// else the newest usable snapshot, else the empty aggregate, and then
/// applies every later event from the log up to the requested version.
/// Only unbounded replays are written back to the cache.
pub struct DomainObjectStore {
    events: Arc<dyn EventStore>,
    snapshots: Arc<dyn SnapshotStore>,
    cache: ObjectCache,
}

impl DomainObjectStore {
    /// Creates a new object store over an event log and a snapshot store.
    pub fn new(
        events: Arc<dyn EventStore>,
        snapshots: Arc<dyn SnapshotStore>,
        config: ObjectStoreConfig,
    ) -> Self {
        Self {
            events,
            snapshots,
            cache: ObjectCache::new(config.cache_ttl),
        }
    }

    pub fn event_store(&self) -> &Arc<dyn EventStore> {
        &self.events
    }

    pub fn snapshot_store(&self) -> &Arc<dyn SnapshotStore> {
        &self.snapshots
    }

    pub fn cache(&self) -> &ObjectCache {
        &self.cache
    }

    /// Replays the object `id` up to `max_version`, `None` meaning latest.
    ///
    /// Objects without events come back as their empty aggregate at
    /// version 0.
    pub async fn replay_object<A: Aggregate>(
        &self,
        id: A::Id,
        max_version: Option<Version>,
    ) -> Result<A> {
        self.replay_object_cancellable(id, max_version, &CancellationToken::new())
            .await
    }

    /// Replays a list aggregate up to `max_version`.
    pub async fn replay_list<A>(&self, max_version: Option<Version>) -> Result<A>
    where
        A: Aggregate<Id = ListScope>,
    {
        self.replay_object(ListScope, max_version).await
    }

    /// Like [`DomainObjectStore::replay_object`], returning
    /// [`ObjectStoreError::Cancelled`] as soon as `cancel` fires.
    #[tracing::instrument(
        skip(self, cancel),
        fields(aggregate_type = A::aggregate_type(), identifier = %id.stream_key())
    )]
    pub async fn replay_object_cancellable<A: Aggregate>(
        &self,
        id: A::Id,
        max_version: Option<Version>,
        cancel: &CancellationToken,
    ) -> Result<A> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!("replay cancelled");
                Err(ObjectStoreError::Cancelled)
            }
            result = self.replay(id, max_version) => result,
        }
    }

    async fn replay<A: Aggregate>(&self, id: A::Id, max_version: Option<Version>) -> Result<A> {
        let mut aggregate = self.starting_point::<A>(id, max_version).await?;
        let base = aggregate.version();

        let query = A::event_query(aggregate.identifier())
            .after(base)
            .bounded_by(max_version);
        let mut stream = self.events.replay(query).await?;
        let mut replayed: u64 = 0;

        while let Some(stored) = stream.next().await {
            aggregate.apply_replayed(ReplayedEvent::from_stored(stored?)?)?;
            replayed += 1;
        }

        metrics::histogram!("object_store_replayed_events").record(replayed as f64);
        tracing::debug!(%base, version = %aggregate.version(), replayed, "replay complete");

        // Objects without events are not cached.
        if max_version.is_none() && aggregate.version() > Version::initial() {
            self.cache.insert(&aggregate);
        }
        Ok(aggregate)
    }

    /// Picks the aggregate the catch-up replay starts from.
    async fn starting_point<A: Aggregate>(
        &self,
        id: A::Id,
        max_version: Option<Version>,
    ) -> Result<A> {
        if let Some(cached) = self.cache.get::<A>(&id) {
            match max_version {
                Some(max) if cached.version() > max => {
                    tracing::trace!(cached = %cached.version(), %max, "cached copy too new");
                }
                _ => {
                    metrics::counter!("object_store_cache_hits_total").increment(1);
                    return Ok(cached);
                }
            }
        }
        metrics::counter!("object_store_cache_misses_total").increment(1);

        let key = id.stream_key();
        let snapshot = match max_version {
            Some(max) => {
                self.snapshots
                    .get_snapshot_at(A::aggregate_type(), &key, max)
                    .await?
            }
            None => self.snapshots.get_snapshot(A::aggregate_type(), &key).await?,
        };

        match snapshot {
            Some(snapshot) => Ok(A::restore_snapshot(&snapshot)?),
            None => Ok(A::for_identifier(id)),
        }
    }
}
