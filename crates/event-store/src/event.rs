use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random event ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an event ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of an event in the log, and the version of the aggregate that
/// last applied it.
///
/// The log assigns positions starting at 1; version 0 is an aggregate to
/// which no event has been applied yet.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a new version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the initial version (0) for a new aggregate.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the first position the log assigns.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Version> for i64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

/// Compact per-event header.
///
/// Replay filters only look at this header, so a single aggregate stream can
/// be isolated from the shared log without decoding event bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// The type of the event (e.g., "EnvironmentCreated").
    pub event_type: String,

    /// The type of aggregate the event belongs to (e.g., "ConfigEnvironment").
    pub aggregate_type: String,

    /// Stream key of the aggregate the event applies to.
    pub identifier: String,
}

/// An event that has not been written to the log yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEvent {
    pub event_id: EventId,
    pub metadata: EventMetadata,
    pub payload: serde_json::Value,
}

impl NewEvent {
    /// Creates a new event builder.
    pub fn builder() -> NewEventBuilder {
        NewEventBuilder::default()
    }
}

/// An event as it is stored in the log, with its assigned position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEvent {
    /// Unique identifier for this event.
    pub event_id: EventId,

    /// Position assigned by the log.
    pub position: Version,

    /// Commit time.
    pub timestamp: DateTime<Utc>,

    /// Header used for filtering.
    pub metadata: EventMetadata,

    /// The event payload as JSON.
    pub payload: serde_json::Value,
}

impl StoredEvent {
    /// Creates the stored form of `event` at `position`, committed now.
    pub fn committed(event: NewEvent, position: Version) -> Self {
        Self {
            event_id: event.event_id,
            position,
            timestamp: Utc::now(),
            metadata: event.metadata,
            payload: event.payload,
        }
    }
}

/// Builder for constructing new events.
#[derive(Debug, Default)]
pub struct NewEventBuilder {
    event_id: Option<EventId>,
    event_type: Option<String>,
    aggregate_type: Option<String>,
    identifier: Option<String>,
    payload: Option<serde_json::Value>,
}

impl NewEventBuilder {
    /// Sets the event ID. If not set, a new ID will be generated.
    pub fn event_id(mut self, id: EventId) -> Self {
        self.event_id = Some(id);
        self
    }

    /// Sets the event type.
    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    /// Sets the aggregate type.
    pub fn aggregate_type(mut self, aggregate_type: impl Into<String>) -> Self {
        self.aggregate_type = Some(aggregate_type.into());
        self
    }

    /// Sets the stream key of the target aggregate.
    pub fn identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    /// Sets the payload from a serializable value.
    pub fn payload<T: Serialize>(mut self, payload: &T) -> Result<Self, serde_json::Error> {
        self.payload = Some(serde_json::to_value(payload)?);
        Ok(self)
    }

    /// Sets the payload from a raw JSON value.
    pub fn payload_raw(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Builds the event, returning None if a required field is missing.
    pub fn try_build(self) -> Option<NewEvent> {
        Some(NewEvent {
            event_id: self.event_id.unwrap_or_default(),
            metadata: EventMetadata {
                event_type: self.event_type?,
                aggregate_type: self.aggregate_type?,
                identifier: self.identifier?,
            },
            payload: self.payload?,
        })
    }

    /// Builds the event.
    ///
    /// # Panics
    ///
    /// Panics if event_type, aggregate_type, identifier or payload is not set.
    pub fn build(self) -> NewEvent {
        self.try_build()
            .expect("event_type, aggregate_type, identifier and payload are required")
    }
}
