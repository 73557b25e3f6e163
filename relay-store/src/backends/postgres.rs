//! PostgreSQL message store.
//!
//! Table `relay_messages`, created by the migrations embedded from
//! `migrations/`. Claims hold a row lock (`FOR UPDATE SKIP LOCKED`) inside a
//! transaction owned by the [`Claimed`]; committing the claim writes the new
//! state and commits, dropping it rolls back.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relay_common::{Message, MessageId, NewMessage, Priority, Status};
use sqlx::{
    Postgres, Row, Transaction,
    postgres::{PgPool, PgPoolOptions, PgRow},
    types::Json,
};

use crate::{
    StoreError,
    config::PostgresConfig,
    r#trait::{ClaimGuard, Claimed, MessageStore},
};

const COLUMNS: &str =
    "id, data, priority, status, retry_count, log, created_at, updated_at, sent_at";

/// Status discriminants a worker may still attempt, as a SQL list
const SENDABLE: &str = "(1, 2)";

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool, applying the migrations if configured to
    ///
    /// # Errors
    /// If the database cannot be reached or a migration fails
    pub async fn connect(config: &PostgresConfig) -> crate::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.url)
            .await?;

        let store = Self::from_pool(pool);
        if config.migrate {
            store.migrate().await?;
        }

        Ok(store)
    }

    /// Apply the embedded migrations
    ///
    /// # Errors
    /// If a migration fails
    pub async fn migrate(&self) -> crate::Result<()> {
        sqlx::migrate!().run(&self.pool).await?;
        tracing::debug!("Store migrations applied");
        Ok(())
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn message_from_row(row: &PgRow) -> crate::Result<Message> {
    let id = MessageId::new(row.try_get("id")?);
    let invalid = |reason: String| StoreError::InvalidRow { id, reason };

    let retry_count: i32 = row.try_get("retry_count")?;

    Ok(Message {
        id,
        data: row.try_get("data")?,
        priority: Priority::try_from(row.try_get::<i16, _>("priority")?)?,
        status: Status::try_from(row.try_get::<i16, _>("status")?)?,
        retry_count: u32::try_from(retry_count)
            .map_err(|_| invalid(format!("negative retry count {retry_count}")))?,
        log: row.try_get("log")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        sent_at: row.try_get("sent_at")?,
    })
}

fn messages_from_rows(rows: &[PgRow]) -> crate::Result<Vec<Message>> {
    rows.iter().map(message_from_row).collect()
}

fn limit_to_sql(limit: Option<usize>) -> Option<i64> {
    limit.map(|limit| i64::try_from(limit).unwrap_or(i64::MAX))
}

#[async_trait]
impl MessageStore for PostgresStore {
    async fn enqueue(&self, message: NewMessage) -> crate::Result<MessageId> {
        let id: i64 =
            sqlx::query_scalar("INSERT INTO relay_messages (data, priority) VALUES ($1, $2) RETURNING id")
                .bind(&message.data)
                .bind(message.priority.as_i16())
                .fetch_one(&self.pool)
                .await?;

        Ok(MessageId::new(id))
    }

    async fn enqueue_many(
        &self,
        messages: Vec<NewMessage>,
        batch_size: Option<usize>,
    ) -> crate::Result<Vec<MessageId>> {
        if messages.is_empty() {
            return Ok(Vec::new());
        }

        let chunk_size = batch_size.filter(|size| *size > 0).unwrap_or(messages.len());
        let mut ids = Vec::with_capacity(messages.len());
        let mut tx = self.pool.begin().await?;

        for chunk in messages.chunks(chunk_size) {
            let (data, priorities): (Vec<_>, Vec<_>) = chunk
                .iter()
                .map(|message| (Json(message.data.clone()), message.priority.as_i16()))
                .unzip();

            let inserted: Vec<i64> = sqlx::query_scalar(
                r"
                INSERT INTO relay_messages (data, priority)
                SELECT data, priority
                FROM UNNEST($1::jsonb[], $2::smallint[]) WITH ORDINALITY AS t (data, priority, ord)
                ORDER BY ord
                RETURNING id
                ",
            )
            .bind(data)
            .bind(priorities)
            .fetch_all(&mut *tx)
            .await?;

            // Ids are drawn in `ord` order but RETURNING does not promise any order
            let mut inserted: Vec<MessageId> = inserted.into_iter().map(MessageId::new).collect();
            inserted.sort_unstable();
            ids.extend(inserted);
        }

        tx.commit().await?;

        Ok(ids)
    }

    async fn select_batch(&self, limit: Option<usize>) -> crate::Result<Vec<Message>> {
        let rows = sqlx::query(&format!(
            r"
            SELECT {COLUMNS}
            FROM relay_messages
            WHERE status IN {SENDABLE}
            ORDER BY CASE WHEN status = 1 THEN 0 ELSE 1 END,
                     priority DESC, created_at ASC, id ASC
            LIMIT $1
            "
        ))
        .bind(limit_to_sql(limit))
        .fetch_all(&self.pool)
        .await?;

        messages_from_rows(&rows)
    }

    async fn lock_for_sending(&self, id: MessageId) -> crate::Result<Option<Claimed>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            r"
            SELECT {COLUMNS}
            FROM relay_messages
            WHERE id = $1 AND status IN {SENDABLE}
            FOR UPDATE SKIP LOCKED
            "
        ))
        .bind(id.get())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let message = message_from_row(&row)?;
        Ok(Some(Claimed::new(message, Box::new(PostgresClaim { tx }))))
    }

    async fn has_sendable_messages(&self) -> crate::Result<bool> {
        let exists: bool = sqlx::query_scalar(&format!(
            "SELECT EXISTS (SELECT 1 FROM relay_messages WHERE status IN {SENDABLE})"
        ))
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn delete_all_sent(&self) -> crate::Result<u64> {
        let result = sqlx::query("DELETE FROM relay_messages WHERE status = $1")
            .bind(Status::Sent.as_i16())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_sent_before(&self, cutoff: DateTime<Utc>) -> crate::Result<u64> {
        let result = sqlx::query("DELETE FROM relay_messages WHERE status = $1 AND sent_at <= $2")
            .bind(Status::Sent.as_i16())
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn get(&self, id: MessageId) -> crate::Result<Message> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM relay_messages WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(id))?;

        message_from_row(&row)
    }

    async fn list(&self, status: Option<Status>) -> crate::Result<Vec<Message>> {
        let rows = sqlx::query(&format!(
            r"
            SELECT {COLUMNS}
            FROM relay_messages
            WHERE $1::smallint IS NULL OR status = $1
            ORDER BY id ASC
            "
        ))
        .bind(status.map(Status::as_i16))
        .fetch_all(&self.pool)
        .await?;

        messages_from_rows(&rows)
    }
}

struct PostgresClaim {
    tx: Transaction<'static, Postgres>,
}

impl fmt::Debug for PostgresClaim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresClaim").finish_non_exhaustive()
    }
}

#[async_trait]
impl ClaimGuard for PostgresClaim {
    async fn commit(self: Box<Self>, message: &Message) -> crate::Result<()> {
        let Self { mut tx } = *self;
        let retry_count = i32::try_from(message.retry_count).map_err(|_| StoreError::InvalidRow {
            id: message.id,
            reason: format!("retry count {} out of range", message.retry_count),
        })?;

        sqlx::query(
            r"
            UPDATE relay_messages
            SET status = $2, log = $3, retry_count = $4, updated_at = $5, sent_at = $6
            WHERE id = $1
            ",
        )
        .bind(message.id.get())
        .bind(message.status.as_i16())
        .bind(&message.log)
        .bind(retry_count)
        .bind(message.updated_at)
        .bind(message.sent_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
