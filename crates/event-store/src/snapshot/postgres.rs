use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};

use super::{DomainObjectSnapshot, SnapshotResult, SnapshotStore};
use crate::Version;

/// PostgreSQL-backed snapshot store.
#[derive(Clone)]
pub struct PostgresSnapshotStore {
    pool: PgPool,
}

impl PostgresSnapshotStore {
    /// Creates a new PostgreSQL snapshot store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to `url` and returns a store over a fresh pool.
    pub async fn connect(url: &str) -> SnapshotResult<Self> {
        Ok(Self::new(PgPool::connect(url).await?))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> SnapshotResult<()> {
        sqlx::migrate!("../../migrations/postgres")
            .run(&self.pool)
            .await?;
        Ok(())
    }

    fn row_to_snapshot(row: PgRow) -> SnapshotResult<DomainObjectSnapshot> {
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
impl SnapshotStore for PostgresSnapshotStore {
    async fn save_snapshots(&self, snapshots: Vec<DomainObjectSnapshot>) -> SnapshotResult<()> {
        let mut tx = self.pool.begin().await?;

        for snapshot in &snapshots {
            sqlx::query(
                r#"
                INSERT INTO snapshots (data_type, identifier, object_version, schema_version, serialized_state)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (data_type, identifier, object_version) DO UPDATE SET
                    schema_version = EXCLUDED.schema_version,
                    serialized_state = EXCLUDED.serialized_state,
                    created_at = now()
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
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT data_type, identifier, object_version, schema_version, serialized_state
            FROM snapshots
            WHERE data_type = $1 AND identifier = $2
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
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT data_type, identifier, object_version, schema_version, serialized_state
            FROM snapshots
            WHERE data_type = $1 AND identifier = $2 AND object_version <= $3
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
