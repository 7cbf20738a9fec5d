use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;
use futures_util::StreamExt;

use crate::{EventQuery, EventStoreError, NewEvent, Result, StoredEvent, Version};

/// Options for appending events to the log.
#[derive(Debug, Clone, Default)]
pub struct AppendOptions {
    /// Expected current version of the target stream for optimistic
    /// concurrency control. If None, no version check is performed.
    pub expected_version: Option<Version>,
}

impl AppendOptions {
    /// Creates options with no version check.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options expecting the stream to be at a specific version.
    pub fn expect_version(version: Version) -> Self {
        Self {
            expected_version: Some(version),
        }
    }

    /// Creates options expecting the stream to be empty.
    pub fn expect_new() -> Self {
        Self {
            expected_version: Some(Version::initial()),
        }
    }
}

/// A stream of stored events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StoredEvent>> + Send>>;

/// The append-only event log.
///
/// The log is the only authority on ordering: it assigns monotonically
/// increasing positions, and a forward replay yields events in assignment
/// order. All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends events to one aggregate stream.
    ///
    /// Events are appended atomically - either all succeed or none do.
    /// If `options.expected_version` is set, the operation fails with
    /// `ConcurrencyConflict` when the stream's current version differs.
    ///
    /// Returns the position assigned to the last appended event.
    async fn append(&self, events: Vec<NewEvent>, options: AppendOptions) -> Result<Version>;

    /// Streams the events selected by `query`.
    async fn replay(&self, query: EventQuery) -> Result<EventStream>;

    /// Returns the position of the newest event, or 0 for an empty log.
    async fn head_position(&self) -> Result<Version>;

    /// Returns the position of the newest event of one stream.
    ///
    /// Returns None if the stream has no events.
    async fn stream_version(&self, identifier: &str) -> Result<Option<Version>>;
}

/// Extension trait providing convenience methods for event logs.
#[async_trait]
pub trait EventStoreExt: EventStore {
    /// Appends a single event.
    async fn append_event(&self, event: NewEvent, options: AppendOptions) -> Result<Version> {
        self.append(vec![event], options).await
    }

    /// Replays `query`, handing every event accepted by `metadata_filter` to
    /// `consumer` in stream order.
    ///
    /// The replay stops early when `consumer` returns false. Returns the
    /// number of events handed to `consumer`.
    async fn replay_as_stream<F, C>(
        &self,
        query: EventQuery,
        mut metadata_filter: F,
        mut consumer: C,
    ) -> Result<u64>
    where
        F: FnMut(&StoredEvent) -> bool + Send,
        C: FnMut(StoredEvent) -> bool + Send,
    {
        let mut stream = self.replay(query).await?;
        let mut consumed = 0;

        while let Some(event) = stream.next().await {
            let event = event?;
            if !metadata_filter(&event) {
                continue;
            }
            consumed += 1;
            if !consumer(event) {
                break;
            }
        }

        Ok(consumed)
    }

    /// Collects every event selected by `query`.
    async fn collect_events(&self, query: EventQuery) -> Result<Vec<StoredEvent>> {
        let mut events = Vec::new();
        self.replay_as_stream(
            query,
            |_| true,
            |event| {
                events.push(event);
                true
            },
        )
        .await?;
        Ok(events)
    }
}

// Blanket implementation for all EventStore implementations
impl<T: EventStore + ?Sized> EventStoreExt for T {}

/// Validates a batch of events before appending.
///
/// A batch must be non-empty and target exactly one stream.
pub fn validate_events_for_append(events: &[NewEvent]) -> Result<&NewEvent> {
    let Some(first) = events.first() else {
        return Err(EventStoreError::InvalidAppend(
            "Cannot append empty event list".to_string(),
        ));
    };

    for event in events.iter().skip(1) {
        if event.metadata.identifier != first.metadata.identifier {
            return Err(EventStoreError::InvalidAppend(
                "All events must be for the same stream".to_string(),
            ));
        }
        if event.metadata.aggregate_type != first.metadata.aggregate_type {
            return Err(EventStoreError::InvalidAppend(
                "All events must have the same aggregate type".to_string(),
            ));
        }
    }

    Ok(first)
}
