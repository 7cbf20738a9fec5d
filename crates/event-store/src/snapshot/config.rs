use std::path::PathBuf;
use std::sync::Arc;

use super::{
    FileSnapshotStore, InMemorySnapshotStore, PostgresSnapshotStore, SnapshotResult,
    SnapshotStore, SqliteSnapshotStore,
};
use crate::SnapshotStoreError;

/// Selects and configures a snapshot store backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotStoreConfig {
    /// Process-local, lost on restart.
    Memory,
    /// Embedded JSON-lines data file.
    File { path: PathBuf },
    /// PostgreSQL database.
    Postgres { url: String },
    /// SQLite database.
    Sqlite { url: String },
}

impl SnapshotStoreConfig {
    /// Builds a configuration from a backend name and its location.
    ///
    /// `location` is the data file path for `file` and the connection
    /// string for `postgres` and `sqlite`; it is ignored for `memory`.
    pub fn parse(backend: &str, location: Option<&str>) -> SnapshotResult<Self> {
        let required = |what: &str| {
            location.map(str::to_string).ok_or_else(|| {
                SnapshotStoreError::Configuration(format!(
                    "backend '{backend}' requires a {what}"
                ))
            })
        };

        match backend.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File {
                path: PathBuf::from(required("data file path")?),
            }),
            "postgres" => Ok(Self::Postgres {
                url: required("connection string")?,
            }),
            "sqlite" => Ok(Self::Sqlite {
                url: required("connection string")?,
            }),
            other => Err(SnapshotStoreError::Configuration(format!(
                "unknown snapshot backend '{other}'"
            ))),
        }
    }

    /// Returns the backend name.
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::File { .. } => "file",
            Self::Postgres { .. } => "postgres",
            Self::Sqlite { .. } => "sqlite",
        }
    }

    /// Opens the configured backend, running migrations for the relational
    /// ones.
    pub async fn connect(&self) -> SnapshotResult<Arc<dyn SnapshotStore>> {
        let store: Arc<dyn SnapshotStore> = match self {
            Self::Memory => Arc::new(InMemorySnapshotStore::new()),
            Self::File { path } => Arc::new(FileSnapshotStore::open(path).await?),
            Self::Postgres { url } => {
                let store = PostgresSnapshotStore::connect(url).await?;
                store.run_migrations().await?;
                Arc::new(store)
            }
            Self::Sqlite { url } => {
                let store = SqliteSnapshotStore::connect(url).await?;
                store.run_migrations().await?;
                Arc::new(store)
            }
        };

        tracing::info!(backend = self.backend_name(), "snapshot store ready");
        Ok(store)
    }
}
