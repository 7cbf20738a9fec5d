use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

use super::{DomainObjectSnapshot, SnapshotResult, SnapshotStore};
use crate::Version;

/// SQLite-backed snapshot store.
#[derive(Clone)]
pub struct SqliteSnapshotStore {
    pool: SqlitePool,
}

impl SqliteSnapshotStore {
    /// Creates a new SQLite snapshot store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connects to `url` (e.g. `sqlite://snapshots.db?mode=rwc`).
    ///
    /// In-memory databases (`sqlite::memory:`) are private to one
    /// connection, so the pool is limited to a single connection for them.
    pub async fn connect(url: &str) -> SnapshotResult<Self> {
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> SnapshotResult<()> {
        sqlx::migrate!("../../migrations/sqlite")
            .run(&self.pool)
            .await?;
        Ok(())
    }

    fn row_to_snapshot(row: SqliteRow) -> SnapshotResult<DomainObjectSnapshot> {
        Ok(DomainObjectSnapshot {
            data_type: row.try_get("data_type")?,
            identifier: row.try_get("identifier")?,
            serialized_state: row.try_get("serialized_state")?,
            object_version: Version::new(row.try_get("object_version")?),
            schema_version: row.try_get("schema_version")?,
        })
    }
}

#[async_trait]
impl SnapshotStore for SqliteSnapshotStore {
    async fn save_snapshots(&self, snapshots: Vec<DomainObjectSnapshot>) -> SnapshotResult<()> {
        let mut tx = self.pool.begin().await?;

        for snapshot in &snapshots {
            sqlx::query(
                r#"
                INSERT INTO snapshots (data_type, identifier, object_version, schema_version, serialized_state)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT (data_type, identifier, object_version) DO UPDATE SET
                    schema_version = excluded.schema_version,
                    serialized_state = excluded.serialized_state,
                    created_at = CURRENT_TIMESTAMP
                "#,
            )
            .bind(&snapshot.data_type)
            .bind(&snapshot.identifier)
            .bind(snapshot.object_version.as_i64())
            .bind(snapshot.schema_version)
            .bind(&snapshot.serialized_state)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_snapshot(
        &self,
        data_type: &str,
        identifier: &str,
    ) -> SnapshotResult<Option<DomainObjectSnapshot>> {
        let row: Option<SqliteRow> = sqlx::query(
            r#"
            SELECT data_type, identifier, object_version, schema_version, serialized_state
            FROM snapshots
            WHERE data_type = ?1 AND identifier = ?2
            ORDER BY object_version DESC
            LIMIT 1
            "#,
        )
        .bind(data_type)
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_snapshot).transpose()
    }

    async fn get_snapshot_at(
        &self,
        data_type: &str,
        identifier: &str,
        max_version: Version,
    ) -> SnapshotResult<Option<DomainObjectSnapshot>> {
        let row: Option<SqliteRow> = sqlx::query(
            r#"
            SELECT data_type, identifier, object_version, schema_version, serialized_state
            FROM snapshots
            WHERE data_type = ?1 AND identifier = ?2 AND object_version <= ?3
            ORDER BY object_version DESC
            LIMIT 1
            "#,
        )
        .bind(data_type)
        .bind(identifier)
        .bind(max_version.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_snapshot).transpose()
    }

    async fn get_latest_snapshot_numbers(&self) -> SnapshotResult<i64> {
        let latest: Option<i64> = sqlx::query_scalar("SELECT MAX(object_version) FROM snapshots")
            .fetch_one(&self.pool)
            .await?;
        Ok(latest.unwrap_or(0))
    }
}
