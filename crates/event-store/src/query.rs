use crate::{EventMetadata, Version};

/// Direction in which a replay walks the log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    /// Oldest event first.
    #[default]
    Forward,
    /// Newest event first.
    Backward,
}

/// Default number of events fetched per round-trip by paging backends.
pub const DEFAULT_BATCH_SIZE: usize = 512;

/// Builder for constructing replay queries.
///
/// The metadata fields are pushed down to the backend; positions bound the
/// replay window.
#[derive(Debug, Clone)]
pub struct EventQuery {
    /// Filter by aggregate type.
    pub aggregate_type: Option<String>,

    /// Filter by the stream key of the aggregate.
    pub identifier: Option<String>,

    /// Filter by event types (any of these types).
    pub event_types: Option<Vec<String>>,

    /// Only events strictly after this position.
    pub after: Option<Version>,

    /// Only events at or before this position.
    pub max_version: Option<Version>,

    /// Replay direction.
    pub direction: Direction,

    /// Events fetched per backend round-trip.
    pub batch_size: usize,
}

impl Default for EventQuery {
    fn default() -> Self {
        Self {
            aggregate_type: None,
            identifier: None,
            event_types: None,
            after: None,
            max_version: None,
            direction: Direction::Forward,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl EventQuery {
    /// Creates a new empty query matching every event.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for one aggregate stream.
    pub fn for_stream(aggregate_type: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            aggregate_type: Some(aggregate_type.into()),
            identifier: Some(identifier.into()),
            ..Default::default()
        }
    }

    /// Filters by aggregate type.
    pub fn aggregate_type(mut self, aggregate_type: impl Into<String>) -> Self {
        self.aggregate_type = Some(aggregate_type.into());
        self
    }

    /// Filters by stream key.
    pub fn identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    /// Filters by multiple event types (any of these).
    pub fn event_types<I, T>(mut self, event_types: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.event_types = Some(event_types.into_iter().map(Into::into).collect());
        self
    }

    /// Replays only events after this position (exclusive).
    pub fn after(mut self, version: Version) -> Self {
        self.after = Some(version);
        self
    }

    /// Stops the replay at this position (inclusive).
    pub fn max_version(mut self, version: Version) -> Self {
        self.max_version = Some(version);
        self
    }

    /// Sets an optional upper bound, `None` meaning the head of the log.
    pub fn bounded_by(mut self, version: Option<Version>) -> Self {
        self.max_version = version;
        self
    }

    /// Sets the replay direction.
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Sets the number of events fetched per round-trip (at least 1).
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Returns true if an event with this header and position is selected.
    pub fn matches(&self, metadata: &EventMetadata, position: Version) -> bool {
        if let Some(ref aggregate_type) = self.aggregate_type
            && &metadata.aggregate_type != aggregate_type
        {
            return false;
        }
        if let Some(ref identifier) = self.identifier
            && &metadata.identifier != identifier
        {
            return false;
        }
        if let Some(ref types) = self.event_types
            && !types.contains(&metadata.event_type)
        {
            return false;
        }
        if let Some(after) = self.after
            && position <= after
        {
            return false;
        }
        if let Some(max) = self.max_version
            && position > max
        {
            return false;
        }
        true
    }
}
