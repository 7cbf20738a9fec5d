//! Conditions that start a snapshot run.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use event_store::{EventStore, SnapshotStore};
use tokio::sync::Notify;

use crate::error::Result;

/// A condition that tells the snapshot service to create snapshots.
///
/// `wait_for_trigger` resolves once when the condition is met. The service
/// drops the pending future when it stops a trigger, so implementations
/// must be cancel-safe.
#[async_trait]
pub trait SnapshotTrigger: Send + Sync {
    /// Returns the name of this trigger, used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Waits until a snapshot run should start.
    async fn wait_for_trigger(&self);
}

/// Fires when [`OnDemandSnapshotTrigger::request`] is called.
///
/// A request made while nobody waits is kept and fires the next wait.
#[derive(Debug, Default)]
pub struct OnDemandSnapshotTrigger {
    requested: Notify,
}

impl OnDemandSnapshotTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a snapshot run.
    pub fn request(&self) {
        self.requested.notify_one();
    }
}

#[async_trait]
impl SnapshotTrigger for OnDemandSnapshotTrigger {
    fn name(&self) -> &'static str {
        "on_demand"
    }

    async fn wait_for_trigger(&self) {
        self.requested.notified().await;
    }
}

/// Fires once per interval, measured from when it was started.
#[derive(Debug, Clone)]
pub struct ScheduledSnapshotTrigger {
    interval: Duration,
}

impl ScheduledSnapshotTrigger {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

#[async_trait]
impl SnapshotTrigger for ScheduledSnapshotTrigger {
    fn name(&self) -> &'static str {
        "scheduled"
    }

    async fn wait_for_trigger(&self) {
        tokio::time::sleep(self.interval).await;
    }
}

/// Fires when the log has grown by `threshold` positions past the newest
/// snapshot.
pub struct NumberThresholdSnapshotTrigger {
    events: Arc<dyn EventStore>,
    snapshots: Arc<dyn SnapshotStore>,
    threshold: i64,
    poll_interval: Duration,
}

impl NumberThresholdSnapshotTrigger {
    pub fn new(
        events: Arc<dyn EventStore>,
        snapshots: Arc<dyn SnapshotStore>,
        threshold: i64,
        poll_interval: Duration,
    ) -> Self {
        Self {
            events,
            snapshots,
            threshold: threshold.max(1),
            poll_interval,
        }
    }

    /// Returns how many positions the log is ahead of the newest snapshot.
    pub async fn distance(&self) -> Result<i64> {
        let head = self.events.head_position().await?;
        let latest = self.snapshots.get_latest_snapshot_numbers().await?;
        Ok(head.as_i64() - latest)
    }
}

#[async_trait]
impl SnapshotTrigger for NumberThresholdSnapshotTrigger {
    fn name(&self) -> &'static str {
        "number_threshold"
    }

    async fn wait_for_trigger(&self) {
        loop {
            match self.distance().await {
                Ok(distance) if distance >= self.threshold => {
                    tracing::debug!(distance, threshold = self.threshold, "threshold reached");
                    return;
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(error = %err, "could not compare log head with snapshots");
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
