//! In-process cache of replayed aggregates.

use std::any::Any;
use std::collections::HashMap;
use std::time::Duration;

use common::Identifier;
use domain::Aggregate;
use event_store::Version;
use parking_lot::{Mutex, RwLock};
use tokio::time::Instant;

type CacheKey = (&'static str, String);

struct CacheEntry {
    aggregate: Box<dyn Any + Send + Sync>,
    version: Version,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Aggregates keyed by aggregate type and stream key, each with an expiry.
///
/// Entries are only ever inserted from a completed replay, so an entry is
/// never newer than the committed log. Expired entries are ignored by
/// lookups; inserts sweep them out at most once per TTL, so the map holds
/// no entry older than twice the TTL.
pub struct ObjectCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    next_sweep: Mutex<Instant>,
    ttl: Duration,
}

impl ObjectCache {
    /// Creates an empty cache whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            next_sweep: Mutex::new(Instant::now() + ttl),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn key<A: Aggregate>(id: &A::Id) -> CacheKey {
        (A::aggregate_type(), id.stream_key())
    }

    /// Returns a copy of the live entry for `id`, if any.
    pub fn get<A: Aggregate>(&self, id: &A::Id) -> Option<A> {
        let entries = self.entries.read();
        let entry = entries.get(&Self::key::<A>(id))?;
        if !entry.is_live(Instant::now()) {
            return None;
        }
        entry.aggregate.downcast_ref::<A>().cloned()
    }

    /// Stores `aggregate` with a fresh expiry.
    ///
    /// A live entry at a higher version is kept. Returns true if the
    /// aggregate was stored.
    pub fn insert<A: Aggregate>(&self, aggregate: &A) -> bool {
        let key = Self::key::<A>(aggregate.identifier());
        let now = Instant::now();
        let mut entries = self.entries.write();

        let mut next_sweep = self.next_sweep.lock();
        if now >= *next_sweep {
            entries.retain(|_, entry| entry.is_live(now));
            *next_sweep = now + self.ttl;
        }
        drop(next_sweep);

        if let Some(existing) = entries.get(&key)
            && existing.is_live(now)
            && existing.version > aggregate.version()
        {
            return false;
        }

        entries.insert(
            key,
            CacheEntry {
                aggregate: Box::new(aggregate.clone()),
                version: aggregate.version(),
                expires_at: now + self.ttl,
            },
        );
        true
    }

    /// Drops the entry for `id`.
    pub fn invalidate<A: Aggregate>(&self, id: &A::Id) {
        self.entries.write().remove(&Self::key::<A>(id));
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
