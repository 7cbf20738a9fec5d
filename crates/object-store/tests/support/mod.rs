//! Test doubles and fixtures shared by the object store suites.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use event_store::{
    AppendOptions, EventQuery, EventStore, EventStoreError, EventStream, InMemoryEventStore,
    InMemorySnapshotStore, NewEvent, Result, SnapshotStore, Version,
};
use object_store::{CommandService, DomainObjectStore, KeyQueryService, ObjectStoreConfig};
use parking_lot::Mutex;

/// Event log that records the replay window of every query and can be
/// switched into failing.
#[derive(Clone, Default)]
pub struct RecordingEventStore {
    inner: InMemoryEventStore,
    replays: Arc<Mutex<Vec<EventQuery>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// `after` bounds of the replays issued so far, oldest first.
    pub fn replayed_after(&self) -> Vec<Option<Version>> {
        self.replays.lock().iter().map(|q| q.after).collect()
    }

    pub fn last_replay(&self) -> Option<EventQuery> {
        self.replays.lock().last().cloned()
    }

    pub fn clear_replays(&self) {
        self.replays.lock().clear();
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EventStoreError::InvalidAppend("event log offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl EventStore for RecordingEventStore {
    async fn append(&self, events: Vec<NewEvent>, options: AppendOptions) -> Result<Version> {
        self.check()?;
        self.inner.append(events, options).await
    }

    async fn replay(&self, query: EventQuery) -> Result<EventStream> {
        self.check()?;
        self.replays.lock().push(query.clone());
        self.inner.replay(query).await
    }

    async fn head_position(&self) -> Result<Version> {
        self.check()?;
        self.inner.head_position().await
    }

    async fn stream_version(&self, identifier: &str) -> Result<Option<Version>> {
        self.check()?;
        self.inner.stream_version(identifier).await
    }
}

/// An object store with its services over in-memory backends.
pub struct Harness {
    pub events: RecordingEventStore,
    pub snapshots: Arc<InMemorySnapshotStore>,
    pub store: Arc<DomainObjectStore>,
    pub commands: CommandService,
    pub queries: KeyQueryService,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_secs(60))
    }

    pub fn with_ttl(cache_ttl: Duration) -> Self {
        let events = RecordingEventStore::new();
        let snapshots = Arc::new(InMemorySnapshotStore::new());
        Self::over(events, snapshots, cache_ttl)
    }

    /// A second store over the same backends with an empty cache.
    pub fn restarted(&self) -> Self {
        Self::over(
            self.events.clone(),
            self.snapshots.clone(),
            self.store.cache().ttl(),
        )
    }

    fn over(
        events: RecordingEventStore,
        snapshots: Arc<InMemorySnapshotStore>,
        cache_ttl: Duration,
    ) -> Self {
        let snapshot_store: Arc<dyn SnapshotStore> = snapshots.clone();
        let store = Arc::new(DomainObjectStore::new(
            Arc::new(events.clone()),
            snapshot_store,
            ObjectStoreConfig::default().with_cache_ttl(cache_ttl),
        ));
        Self {
            events,
            snapshots,
            commands: CommandService::new(store.clone()),
            queries: KeyQueryService::new(store.clone()),
            store,
        }
    }
}
