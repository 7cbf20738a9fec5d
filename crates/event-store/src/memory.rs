use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream;
use tokio::sync::RwLock;

use crate::{
    Direction, EventQuery, EventStoreError, NewEvent, Result, StoredEvent, Version,
    store::{AppendOptions, EventStore, EventStream, validate_events_for_append},
};

/// In-memory event log.
///
/// Events are kept in position order in a single vector; position `n` lives
/// at index `n - 1`.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    events: Arc<RwLock<Vec<StoredEvent>>>,
}

impl InMemoryEventStore {
    /// Creates a new empty in-memory event log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of events stored.
    pub async fn event_count(&self) -> usize {
        self.events.read().await.len()
    }

    /// Clears all events.
    pub async fn clear(&self) {
        self.events.write().await.clear();
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, events: Vec<NewEvent>, options: AppendOptions) -> Result<Version> {
        let identifier = validate_events_for_append(&events)?.metadata.identifier.clone();

        let mut log = self.events.write().await;

        let current_version = log
            .iter()
            .rev()
            .find(|e| e.metadata.identifier == identifier)
            .map(|e| e.position)
            .unwrap_or(Version::initial());

        if let Some(expected) = options.expected_version
            && current_version != expected
        {
            return Err(EventStoreError::ConcurrencyConflict {
                identifier,
                expected,
                actual: current_version,
            });
        }

        let appended = events.len() as u64;
        let mut position = Version::new(log.len() as i64);
        for event in events {
            position = position.next();
            log.push(StoredEvent::committed(event, position));
        }

        metrics::counter!("event_store_events_appended_total").increment(appended);
        tracing::debug!(%identifier, %position, "appended events");
        Ok(position)
    }

    async fn replay(&self, query: EventQuery) -> Result<EventStream> {
        let log = self.events.read().await;
        let mut events: Vec<StoredEvent> = log
            .iter()
            .filter(|e| query.matches(&e.metadata, e.position))
            .cloned()
            .collect();

        if query.direction == Direction::Backward {
            events.reverse();
        }

        Ok(Box::pin(stream::iter(events.into_iter().map(Ok))))
    }

    async fn head_position(&self) -> Result<Version> {
        let log = self.events.read().await;
        Ok(log.last().map(|e| e.position).unwrap_or_default())
    }

    async fn stream_version(&self, identifier: &str) -> Result<Option<Version>> {
        let log = self.events.read().await;
        Ok(log
            .iter()
            .rev()
            .find(|e| e.metadata.identifier == identifier)
            .map(|e| e.position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::EventStoreExt;

    fn create_test_event(identifier: &str, event_type: &str) -> NewEvent {
        NewEvent::builder()
            .aggregate_type("TestAggregate")
            .identifier(identifier)
            .event_type(event_type)
            .payload_raw(serde_json::json!({"test": true}))
            .build()
    }

    #[tokio::test]
    async fn append_single_event() {
        let store = InMemoryEventStore::new();
        let event = create_test_event("a", "TestEvent");

        let result = store.append(vec![event], AppendOptions::expect_new()).await;
        assert_eq!(result.unwrap(), Version::first());
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn append_multiple_events_assigns_consecutive_positions() {
        let store = InMemoryEventStore::new();

        let events = vec![
            create_test_event("a", "Event1"),
            create_test_event("a", "Event2"),
            create_test_event("a", "Event3"),
        ];

        let result = store.append(events, AppendOptions::expect_new()).await;
        assert_eq!(result.unwrap(), Version::new(3));

        let stored = store
            .collect_events(EventQuery::new().identifier("a"))
            .await
            .unwrap();
        let positions: Vec<_> = stored.iter().map(|e| e.position.as_i64()).collect();
        assert_eq!(positions, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn positions_are_global_across_streams() {
        let store = InMemoryEventStore::new();

        store
            .append(vec![create_test_event("a", "E")], AppendOptions::new())
            .await
            .unwrap();
        let v = store
            .append(vec![create_test_event("b", "E")], AppendOptions::expect_new())
            .await
            .unwrap();

        assert_eq!(v, Version::new(2));
        assert_eq!(
            store.stream_version("a").await.unwrap(),
            Some(Version::first())
        );
        assert_eq!(store.stream_version("b").await.unwrap(), Some(v));
        assert_eq!(store.head_position().await.unwrap(), v);
    }

    #[tokio::test]
    async fn concurrency_conflict_on_wrong_version() {
        let store = InMemoryEventStore::new();

        store
            .append(
                vec![create_test_event("a", "Event1")],
                AppendOptions::expect_new(),
            )
            .await
            .unwrap();

        let result = store
            .append(
                vec![create_test_event("a", "Event2")],
                AppendOptions::expect_version(Version::initial()),
            )
            .await;

        assert!(matches!(
            result,
            Err(EventStoreError::ConcurrencyConflict { .. })
        ));
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn other_streams_do_not_conflict() {
        let store = InMemoryEventStore::new();

        store
            .append(vec![create_test_event("a", "E")], AppendOptions::expect_new())
            .await
            .unwrap();
        store
            .append(vec![create_test_event("b", "E")], AppendOptions::expect_new())
            .await
            .unwrap();

        let result = store
            .append(
                vec![create_test_event("a", "E")],
                AppendOptions::expect_version(Version::first()),
            )
            .await;
        assert_eq!(result.unwrap(), Version::new(3));
    }

    #[tokio::test]
    async fn replay_respects_bounds_and_direction() {
        let store = InMemoryEventStore::new();
        for _ in 0..5 {
            store
                .append(vec![create_test_event("a", "E")], AppendOptions::new())
                .await
                .unwrap();
        }

        let query = EventQuery::new()
            .identifier("a")
            .after(Version::new(1))
            .max_version(Version::new(4))
            .direction(Direction::Backward);
        let events = store.collect_events(query).await.unwrap();
        let positions: Vec<_> = events.iter().map(|e| e.position.as_i64()).collect();
        assert_eq!(positions, vec![4, 3, 2]);
    }

    #[tokio::test]
    async fn replay_as_stream_filters_and_stops_early() {
        let store = InMemoryEventStore::new();
        store
            .append(
                vec![
                    create_test_event("a", "Keep"),
                    create_test_event("a", "Skip"),
                    create_test_event("a", "Keep"),
                    create_test_event("a", "Keep"),
                ],
                AppendOptions::new(),
            )
            .await
            .unwrap();

        let mut seen = Vec::new();
        let consumed = store
            .replay_as_stream(
                EventQuery::new(),
                |e| e.metadata.event_type == "Keep",
                |e| {
                    seen.push(e.position.as_i64());
                    seen.len() < 2
                },
            )
            .await
            .unwrap();

        assert_eq!(consumed, 2);
        assert_eq!(seen, vec![1, 3]);
    }

    #[tokio::test]
    async fn empty_log_head_is_zero() {
        let store = InMemoryEventStore::new();
        assert_eq!(store.head_position().await.unwrap(), Version::initial());
        assert!(store.stream_version("a").await.unwrap().is_none());
    }
}
