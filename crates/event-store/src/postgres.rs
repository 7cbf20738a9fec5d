use std::collections::VecDeque;

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Direction, EventId, EventMetadata, EventQuery, EventStoreError, NewEvent, Result,
    StoredEvent, Version,
    store::{AppendOptions, EventStore, EventStream, validate_events_for_append},
};

/// Advisory lock key serializing appends, so positions commit in order.
const APPEND_LOCK_KEY: i64 = 0x0C0F_1605;

/// PostgreSQL-backed event log.
#[derive(Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

/// Cursor state of a paged replay.
struct ReplayCursor {
    pool: PgPool,
    query: EventQuery,
    lower: i64,
    upper: i64,
    buffer: VecDeque<StoredEvent>,
    exhausted: bool,
}

impl PostgresEventStore {
    /// Creates a new PostgreSQL event log.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to `url` and returns a store over a fresh pool.
    pub async fn connect(url: &str) -> Result<Self> {
        Ok(Self::new(PgPool::connect(url).await?))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations/postgres")
            .run(&self.pool)
            .await?;
        Ok(())
    }

    fn row_to_event(row: PgRow) -> Result<StoredEvent> {
        Ok(StoredEvent {
            event_id: EventId::from_uuid(row.try_get::<Uuid, _>("id")?),
            position: Version::new(row.try_get("position")?),
            timestamp: row.try_get("timestamp")?,
            metadata: EventMetadata {
                event_type: row.try_get("event_type")?,
                aggregate_type: row.try_get("aggregate_type")?,
                identifier: row.try_get("identifier")?,
            },
            payload: row.try_get("payload")?,
        })
    }

    async fn fetch_batch(
        pool: &PgPool,
        query: &EventQuery,
        lower: i64,
        upper: i64,
    ) -> Result<Vec<StoredEvent>> {
        let mut sql = String::from(
            "SELECT position, id, event_type, aggregate_type, identifier, timestamp, payload \
             FROM events WHERE position > $1 AND position <= $2",
        );
        let mut param_count = 2;

        if query.aggregate_type.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND aggregate_type = ${param_count}"));
        }
        if query.identifier.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND identifier = ${param_count}"));
        }
        if query.event_types.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND event_type = ANY(${param_count})"));
        }

        match query.direction {
            Direction::Forward => sql.push_str(" ORDER BY position ASC"),
            Direction::Backward => sql.push_str(" ORDER BY position DESC"),
        }
        param_count += 1;
        sql.push_str(&format!(" LIMIT ${param_count}"));

        let mut sqlx_query = sqlx::query(&sql).bind(lower).bind(upper);
        if let Some(ref aggregate_type) = query.aggregate_type {
            sqlx_query = sqlx_query.bind(aggregate_type);
        }
        if let Some(ref identifier) = query.identifier {
            sqlx_query = sqlx_query.bind(identifier);
        }
        if let Some(ref event_types) = query.event_types {
            sqlx_query = sqlx_query.bind(event_types);
        }
        sqlx_query = sqlx_query.bind(query.batch_size as i64);

        let rows = sqlx_query.fetch_all(pool).await?;
        rows.into_iter().map(Self::row_to_event).collect()
    }
}

impl ReplayCursor {
    async fn next_event(mut self) -> Result<Option<(StoredEvent, Self)>> {
        loop {
            if let Some(event) = self.buffer.pop_front() {
                return Ok(Some((event, self)));
            }
            if self.exhausted || self.lower >= self.upper {
                return Ok(None);
            }

            let batch = PostgresEventStore::fetch_batch(
                &self.pool,
                &self.query,
                self.lower,
                self.upper,
            )
            .await?;

            if batch.len() < self.query.batch_size {
                self.exhausted = true;
            }
            if let Some(last) = batch.last() {
                match self.query.direction {
                    Direction::Forward => self.lower = last.position.as_i64(),
                    Direction::Backward => self.upper = last.position.as_i64() - 1,
                }
            }
            self.buffer.extend(batch);
        }
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    async fn append(&self, events: Vec<NewEvent>, options: AppendOptions) -> Result<Version> {
        let identifier = validate_events_for_append(&events)?.metadata.identifier.clone();

        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(APPEND_LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        if let Some(expected) = options.expected_version {
            let current: Option<i64> =
                sqlx::query_scalar("SELECT MAX(position) FROM events WHERE identifier = $1")
                    .bind(&identifier)
                    .fetch_one(&mut *tx)
                    .await?;

            let actual = Version::new(current.unwrap_or(0));
            if actual != expected {
                return Err(EventStoreError::ConcurrencyConflict {
                    identifier,
                    expected,
                    actual,
                });
            }
        }

        let head: Option<i64> = sqlx::query_scalar("SELECT MAX(position) FROM events")
            .fetch_one(&mut *tx)
            .await?;
        let mut position = Version::new(head.unwrap_or(0));

        for event in &events {
            position = position.next();
            sqlx::query(
                r#"
                INSERT INTO events (position, id, event_type, aggregate_type, identifier, timestamp, payload)
                VALUES ($1, $2, $3, $4, $5, now(), $6)
                "#,
            )
            .bind(position.as_i64())
            .bind(event.event_id.as_uuid())
            .bind(&event.metadata.event_type)
            .bind(&event.metadata.aggregate_type)
            .bind(&event.metadata.identifier)
            .bind(&event.payload)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        metrics::counter!("event_store_events_appended_total").increment(events.len() as u64);
        tracing::debug!(%identifier, %position, "appended events");
        Ok(position)
    }

    async fn replay(&self, query: EventQuery) -> Result<EventStream> {
        let cursor = ReplayCursor {
            pool: self.pool.clone(),
            lower: query.after.map(i64::from).unwrap_or(0),
            upper: query.max_version.map(i64::from).unwrap_or(i64::MAX),
            query,
            buffer: VecDeque::new(),
            exhausted: false,
        };

        let stream = futures_util::stream::try_unfold(cursor, ReplayCursor::next_event);
        Ok(Box::pin(stream))
    }

    async fn head_position(&self) -> Result<Version> {
        let head: Option<i64> = sqlx::query_scalar("SELECT MAX(position) FROM events")
            .fetch_one(&self.pool)
            .await?;
        Ok(Version::new(head.unwrap_or(0)))
    }

    async fn stream_version(&self, identifier: &str) -> Result<Option<Version>> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(position) FROM events WHERE identifier = $1")
                .bind(identifier)
                .fetch_one(&self.pool)
                .await?;

        Ok(version.map(Version::new))
    }
}
