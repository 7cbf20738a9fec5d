//! Process configuration loaded from environment variables.

use std::net::SocketAddr;
use std::time::Duration;

use event_store::{SnapshotResult, SnapshotStoreConfig};
use object_store::ObjectStoreConfig;

/// Service configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DATABASE_URL`: PostgreSQL event log; unset keeps the log in memory
/// - `SNAPSHOT_BACKEND`: `memory`, `file`, `postgres` or `sqlite` (default: `"memory"`)
/// - `SNAPSHOT_PATH`: data file of the `file` backend
/// - `SNAPSHOT_CONNECTION`: connection string of the `postgres` and `sqlite` backends
/// - `CACHE_TTL_SECS`: object cache lifetime (default: `60`)
/// - `SNAPSHOT_INTERVAL_SECS`: scheduled snapshot interval (default: `300`)
/// - `SNAPSHOT_THRESHOLD`: log growth that forces a snapshot run (default: `100`)
/// - `SNAPSHOT_POLL_SECS`: how often the threshold is checked (default: `10`)
/// - `METRICS_ADDR`: Prometheus listener (default: `"0.0.0.0:9000"`)
///
/// Unparseable numbers and addresses fall back to their defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub database_url: Option<String>,
    pub snapshot_backend: String,
    pub snapshot_path: Option<String>,
    pub snapshot_connection: Option<String>,
    pub cache_ttl: Duration,
    pub snapshot_interval: Duration,
    pub snapshot_threshold: i64,
    pub snapshot_poll_interval: Duration,
    pub metrics_addr: SocketAddr,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration from `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let secs = |name: &str, default: Duration| {
            lookup(name)
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default)
        };

        Self {
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            snapshot_backend: lookup("SNAPSHOT_BACKEND").unwrap_or(defaults.snapshot_backend),
            snapshot_path: lookup("SNAPSHOT_PATH"),
            snapshot_connection: lookup("SNAPSHOT_CONNECTION"),
            cache_ttl: secs("CACHE_TTL_SECS", defaults.cache_ttl),
            snapshot_interval: secs("SNAPSHOT_INTERVAL_SECS", defaults.snapshot_interval),
            snapshot_threshold: lookup("SNAPSHOT_THRESHOLD")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.snapshot_threshold),
            snapshot_poll_interval: secs("SNAPSHOT_POLL_SECS", defaults.snapshot_poll_interval),
            metrics_addr: lookup("METRICS_ADDR")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.metrics_addr),
        }
    }

    /// Returns the snapshot backend selection.
    pub fn snapshot_store(&self) -> SnapshotResult<SnapshotStoreConfig> {
        let location = if self.snapshot_backend.eq_ignore_ascii_case("file") {
            self.snapshot_path.as_deref()
        } else {
            self.snapshot_connection.as_deref()
        };
        SnapshotStoreConfig::parse(&self.snapshot_backend, location)
    }

    pub fn object_store(&self) -> ObjectStoreConfig {
        ObjectStoreConfig::default().with_cache_ttl(self.cache_ttl)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            database_url: None,
            snapshot_backend: "memory".to_string(),
            snapshot_path: None,
            snapshot_connection: None,
            cache_ttl: object_store::config::DEFAULT_CACHE_TTL,
            snapshot_interval: Duration::from_secs(300),
            snapshot_threshold: 100,
            snapshot_poll_interval: Duration::from_secs(10),
            metrics_addr: SocketAddr::from(([0, 0, 0, 0], 9000)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;

    use super::*;

    fn from_vars(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.log_level, "info");
        assert!(config.database_url.is_none());
        assert_eq!(config.snapshot_backend, "memory");
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.snapshot_interval, Duration::from_secs(300));
        assert_eq!(config.snapshot_threshold, 100);
        assert_eq!(config.snapshot_poll_interval, Duration::from_secs(10));
        assert_eq!(config.metrics_addr.to_string(), "0.0.0.0:9000");
    }

    #[test]
    fn test_empty_lookup_matches_defaults() {
        let config = from_vars(&[]);
        let defaults = Config::default();
        assert_eq!(config.log_level, defaults.log_level);
        assert_eq!(config.cache_ttl, defaults.cache_ttl);
        assert_eq!(config.metrics_addr, defaults.metrics_addr);
        assert_eq!(config.snapshot_store().unwrap(), SnapshotStoreConfig::Memory);
    }

    #[test]
    fn test_overrides() {
        let config = from_vars(&[
            ("DATABASE_URL", "postgres://localhost/config"),
            ("CACHE_TTL_SECS", "5"),
            ("SNAPSHOT_THRESHOLD", "10"),
            ("METRICS_ADDR", "127.0.0.1:9100"),
        ]);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/config")
        );
        assert_eq!(config.cache_ttl, Duration::from_secs(5));
        assert_eq!(config.object_store().cache_ttl, Duration::from_secs(5));
        assert_eq!(config.snapshot_threshold, 10);
        assert_eq!(config.metrics_addr.to_string(), "127.0.0.1:9100");
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = from_vars(&[("CACHE_TTL_SECS", "soon"), ("METRICS_ADDR", "nowhere")]);
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.metrics_addr.to_string(), "0.0.0.0:9000");
    }

    #[test]
    fn test_snapshot_backend_location() {
        let file = from_vars(&[
            ("SNAPSHOT_BACKEND", "file"),
            ("SNAPSHOT_PATH", "/var/lib/config/snapshots.jsonl"),
            ("SNAPSHOT_CONNECTION", "sqlite::memory:"),
        ]);
        assert_eq!(
            file.snapshot_store().unwrap(),
            SnapshotStoreConfig::File {
                path: PathBuf::from("/var/lib/config/snapshots.jsonl")
            }
        );

        let sqlite = from_vars(&[
            ("SNAPSHOT_BACKEND", "sqlite"),
            ("SNAPSHOT_CONNECTION", "sqlite::memory:"),
        ]);
        assert_eq!(
            sqlite.snapshot_store().unwrap(),
            SnapshotStoreConfig::Sqlite {
                url: "sqlite::memory:".to_string()
            }
        );

        assert!(from_vars(&[("SNAPSHOT_BACKEND", "postgres")])
            .snapshot_store()
            .is_err());
    }
}
