use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::MessageId;
use sqlx::{PgExecutor, PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{OutboxError, OutboxMessage, Result, store::OutboxStore};

/// PostgreSQL-backed outbox store.
///
/// Rows live in the `outbox_messages` table; `seq` preserves insertion order.
#[derive(Clone)]
pub struct PostgresOutboxStore {
    pool: PgPool,
}

impl PostgresOutboxStore {
    /// Creates a new PostgreSQL outbox store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_message(row: PgRow) -> Result<OutboxMessage> {
        let attempts: i32 = row.try_get("attempts")?;

        Ok(OutboxMessage::restore(
            MessageId::from_uuid(row.try_get::<Uuid, _>("id")?),
            row.try_get("occurred_at")?,
            row.try_get("message_type")?,
            row.try_get("payload")?,
            row.try_get("processed_at")?,
            u32::try_from(attempts).unwrap_or_default(),
            row.try_get("last_error")?,
        ))
    }
}

/// Inserts one message through the given executor.
///
/// Accepts a pool or an open transaction, so callers that own a wider unit of
/// work can write outbox rows alongside their own. A primary key collision is
/// reported as `DuplicateMessage`.
pub async fn insert_message<'e, E>(executor: E, message: &OutboxMessage) -> Result<()>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO outbox_messages (id, occurred_at, message_type, payload, processed_at, attempts, last_error)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(message.id().as_uuid())
    .bind(message.occurred_at())
    .bind(message.message_type())
    .bind(message.payload())
    .bind(message.processed_at())
    .bind(i32::try_from(message.attempts()).unwrap_or(i32::MAX))
    .bind(message.last_error())
    .execute(executor)
    .await
    .map_err(|err| match err {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            OutboxError::DuplicateMessage(message.id())
        }
        other => OutboxError::Database(other),
    })?;

    Ok(())
}

#[async_trait]
impl OutboxStore for PostgresOutboxStore {
    #[tracing::instrument(skip(self, message), fields(message_id = %message.id()))]
    async fn add(&self, message: OutboxMessage) -> Result<()> {
        insert_message(&self.pool, &message).await
    }

    #[tracing::instrument(skip(self, messages), fields(count = messages.len()))]
    async fn add_all(&self, messages: Vec<OutboxMessage>) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        for message in &messages {
            insert_message(&mut *tx, message).await?;
        }
        tx.commit().await?;

        Ok(messages.len())
    }

    async fn get_unprocessed(&self, limit: usize) -> Result<Vec<OutboxMessage>> {
        let rows = sqlx::query(
            r#"
            SELECT id, occurred_at, message_type, payload, processed_at, attempts, last_error
            FROM outbox_messages
            WHERE processed_at IS NULL
            ORDER BY seq ASC
            LIMIT $1
            "#,
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_message).collect()
    }

    async fn get_deliverable(
        &self,
        limit: usize,
        max_attempts: u32,
    ) -> Result<Vec<OutboxMessage>> {
        let rows = sqlx::query(
            r#"
            SELECT id, occurred_at, message_type, payload, processed_at, attempts, last_error
            FROM outbox_messages
            WHERE processed_at IS NULL AND attempts < $2
            ORDER BY seq ASC
            LIMIT $1
            "#,
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .bind(i32::try_from(max_attempts).unwrap_or(i32::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_message).collect()
    }

    async fn find(&self, id: MessageId) -> Result<Option<OutboxMessage>> {
        let row = sqlx::query(
            r#"
            SELECT id, occurred_at, message_type, payload, processed_at, attempts, last_error
            FROM outbox_messages
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_message).transpose()
    }

    async fn mark_processed(&self, id: MessageId, processed_at: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query("UPDATE outbox_messages SET processed_at = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(processed_at)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(OutboxError::MessageNotFound(id));
        }
        Ok(())
    }

    async fn mark_failed(&self, id: MessageId, error: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE outbox_messages SET attempts = attempts + 1, last_error = $2 WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(error)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(OutboxError::MessageNotFound(id));
        }
        Ok(())
    }
}
