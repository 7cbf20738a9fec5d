use std::time::Duration;

/// Default lifetime of a cache entry.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// Configuration of a [`DomainObjectStore`](crate::DomainObjectStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectStoreConfig {
    /// How long a replayed aggregate stays in the cache.
    pub cache_ttl: Duration,
}

impl ObjectStoreConfig {
    pub fn with_cache_ttl(mut self, cache_ttl: Duration) -> Self {
        self.cache_ttl = cache_ttl;
        self
    }
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}
