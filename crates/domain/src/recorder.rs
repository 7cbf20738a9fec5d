//! Two-phase command recording.

use chrono::Utc;
use common::Identifier;
use event_store::{AppendOptions, EventStore, NewEvent, Version};

use crate::aggregate::{Aggregate, DomainEvent, ReplayedEvent};
use crate::error::DomainError;

/// Records commands against an aggregate and flushes their events.
///
/// Commands are validated against, and applied to, a working copy of the
/// aggregate so that several commands can be chained before one flush.
/// Nothing touches the event log until [`Recorder::write_recorded_events`].
#[derive(Debug)]
pub struct Recorder<A: Aggregate> {
    committed: A,
    working: A,
    pending: Vec<A::Event>,
}

impl<A: Aggregate> Recorder<A> {
    /// Starts recording on top of a loaded aggregate.
    pub fn new(aggregate: A) -> Self {
        Self {
            working: aggregate.clone(),
            committed: aggregate,
            pending: Vec::new(),
        }
    }

    /// The aggregate including pending events.
    pub fn aggregate(&self) -> &A {
        &self.working
    }

    pub fn into_aggregate(self) -> A {
        self.working
    }

    pub fn pending_events(&self) -> &[A::Event] {
        &self.pending
    }

    pub fn has_pending_events(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Runs a command method and queues the events it returns.
    ///
    /// Returns the number of recorded events. A rejected command leaves the
    /// recorder unchanged.
    pub fn record<F>(&mut self, command: F) -> Result<usize, A::Error>
    where
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
    {
        let events = command(&self.working)?;
        for event in &events {
            self.working.apply(event.clone());
        }
        let count = events.len();
        self.pending.extend(events);
        Ok(count)
    }

    /// Appends all pending events in one batch.
    ///
    /// The loaded version is the expected stream version. On success the
    /// aggregate is rebuilt from the committed state with the positions the
    /// log assigned, and the returned version is the log's. With nothing
    /// pending this is a no-op returning the current version.
    pub async fn write_recorded_events<S>(&mut self, store: &S) -> Result<Version, DomainError>
    where
        S: EventStore + ?Sized,
    {
        if self.pending.is_empty() {
            return Ok(self.committed.version());
        }

        let identifier = self.committed.identifier().stream_key();
        let mut batch = Vec::with_capacity(self.pending.len());
        for event in &self.pending {
            batch.push(
                NewEvent::builder()
                    .aggregate_type(A::aggregate_type())
                    .identifier(identifier.as_str())
                    .event_type(event.event_type())
                    .payload(event)?
                    .build(),
            );
        }

        let expected = self.committed.version();
        let last = store
            .append(batch, AppendOptions::expect_version(expected))
            .await?;

        // Positions of one batch are contiguous.
        let first = last.as_i64() - self.pending.len() as i64 + 1;
        let committed_at = Utc::now();
        let mut rebuilt = self.committed.clone();
        for (offset, event) in self.pending.drain(..).enumerate() {
            rebuilt.apply_replayed(ReplayedEvent::new(
                event,
                Version::new(first + offset as i64),
                committed_at,
            ))?;
        }

        tracing::debug!(
            aggregate_type = A::aggregate_type(),
            %identifier,
            %expected,
            version = %last,
            "wrote recorded events"
        );

        self.committed = rebuilt.clone();
        self.working = rebuilt;
        Ok(last)
    }
}
