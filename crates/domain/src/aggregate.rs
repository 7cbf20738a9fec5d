//! Core aggregate and domain event traits.

use chrono::{DateTime, Utc};
use common::Identifier;
use event_store::{DomainObjectSnapshot, EventQuery, StoredEvent, Version};
use serde::{Serialize, de::DeserializeOwned};

use crate::error::DomainError;

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable and should be named in past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + std::fmt::Debug + Send + Sync + Clone {
    /// Returns the event type name.
    ///
    /// This is used for serialization and event log filtering.
    fn event_type(&self) -> &'static str;
}

/// A decoded domain event together with its log position.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayedEvent<E> {
    pub event: E,

    /// Position assigned by the event log.
    pub version: Version,

    /// Commit time.
    pub timestamp: DateTime<Utc>,
}

impl<E: DomainEvent> ReplayedEvent<E> {
    pub fn new(event: E, version: Version, timestamp: DateTime<Utc>) -> Self {
        Self {
            event,
            version,
            timestamp,
        }
    }

    /// Decodes a stored event's payload.
    pub fn from_stored(stored: StoredEvent) -> Result<Self, DomainError> {
        Ok(Self {
            event: serde_json::from_value(stored.payload)?,
            version: stored.position,
            timestamp: stored.timestamp,
        })
    }
}

/// Trait for aggregates in an event-sourced system.
///
/// In event sourcing, aggregates:
/// - Are rebuilt by replaying events
/// - Generate events from commands
/// - Apply events to update state (pure, deterministic)
///
/// The aggregate version is always the version of the last applied event.
pub trait Aggregate: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Identifier of one aggregate instance.
    type Id: Identifier;

    /// The type of events this aggregate produces and consumes.
    type Event: DomainEvent;

    /// The type of errors command methods produce.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the aggregate type name.
    ///
    /// Used as event metadata and as the snapshot data type.
    fn aggregate_type() -> &'static str;

    /// Version of the snapshot serialization format.
    fn schema_version() -> i32 {
        1
    }

    /// Returns the zero-value aggregate for `id` at version 0.
    fn for_identifier(id: Self::Id) -> Self;

    fn identifier(&self) -> &Self::Id;

    /// Returns the current version of the aggregate.
    fn version(&self) -> Version;

    /// Sets the aggregate version.
    fn set_version(&mut self, version: Version);

    /// Applies an event to the aggregate, updating its state.
    ///
    /// Must be pure and deterministic and must not fail: events are facts
    /// that have already happened. When called through
    /// [`Aggregate::apply_replayed`] the version has already been advanced to
    /// the event's version.
    fn apply(&mut self, event: Self::Event);

    /// Selects the events that make up the stream of `id`.
    fn event_query(id: &Self::Id) -> EventQuery {
        EventQuery::for_stream(Self::aggregate_type(), id.stream_key())
    }

    /// Applies a replayed event, enforcing strictly increasing versions.
    fn apply_replayed(&mut self, replayed: ReplayedEvent<Self::Event>) -> Result<(), DomainError> {
        if replayed.version <= self.version() {
            return Err(DomainError::OutOfOrderEvent {
                aggregate_type: Self::aggregate_type(),
                current: self.version(),
                received: replayed.version,
            });
        }
        self.set_version(replayed.version);
        self.apply(replayed.event);
        Ok(())
    }

    /// Serializes the current state and version.
    fn create_snapshot(&self) -> Result<DomainObjectSnapshot, DomainError> {
        Ok(DomainObjectSnapshot::from_state(
            Self::aggregate_type(),
            self.identifier().stream_key(),
            self.version(),
            Self::schema_version(),
            self,
        )?)
    }

    /// Restores an aggregate from a snapshot of the same type and schema.
    fn restore_snapshot(snapshot: &DomainObjectSnapshot) -> Result<Self, DomainError> {
        if snapshot.data_type != Self::aggregate_type() {
            return Err(DomainError::SnapshotTypeMismatch {
                expected: Self::aggregate_type(),
                found: snapshot.data_type.clone(),
            });
        }
        if snapshot.schema_version != Self::schema_version() {
            return Err(DomainError::UnsupportedSchemaVersion {
                aggregate_type: Self::aggregate_type(),
                expected: Self::schema_version(),
                found: snapshot.schema_version,
            });
        }

        let mut aggregate: Self = snapshot.to_state()?;
        aggregate.set_version(snapshot.object_version);
        Ok(aggregate)
    }
}
