use crate::adapters::MessageStore;
use crate::adapters::database::DbPool;
use crate::adapters::database::records::MessageRecord;
use crate::domain::message::{Message, NewMessage};
use crate::error::Result;
use async_trait::async_trait;
use time::OffsetDateTime;

/// Durable store over the `messages` table.
#[derive(Clone, Debug)]
pub struct PostgresMessageStore {
    pool: DbPool,
}

impl PostgresMessageStore {
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

// Postgres keeps microseconds; truncate so the returned message matches what was persisted.
fn to_db_precision(ts: OffsetDateTime) -> OffsetDateTime {
    ts.replace_nanosecond(ts.nanosecond() / 1_000 * 1_000).unwrap_or(ts)
}

#[async_trait]
impl MessageStore for PostgresMessageStore {
    #[tracing::instrument(level = "debug", skip(self, message), fields(room_id = %message.room_id))]
    async fn append(&self, message: NewMessage, now: OffsetDateTime, room_limit: usize) -> Result<Message> {
        let message = Message::create(message, to_db_precision(now))?;
        let limit = i64::try_from(room_limit.max(1)).unwrap_or(i64::MAX);

        let mut tx = self.pool.begin().await?;

        let record = sqlx::query_as::<_, MessageRecord>(
            r#"
            INSERT INTO messages (id, room_id, encrypted_content, sender_key, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, room_id, encrypted_content, sender_key, created_at, expires_at
            "#,
        )
        .bind(message.id)
        .bind(&message.room_id)
        .bind(&message.stored_content)
        .bind(&message.sender_fingerprint)
        .bind(message.expires_at)
        .bind(message.created_at)
        .fetch_one(&mut *tx)
        .await?;

        let dropped = sqlx::query(
            r#"
            DELETE FROM messages
            WHERE id IN (
                SELECT id FROM (
                    SELECT id, ROW_NUMBER() OVER (ORDER BY created_at DESC, id DESC) AS rn
                    FROM messages
                    WHERE room_id = $1
                ) t WHERE t.rn > $2
            )
            "#,
        )
        .bind(&message.room_id)
        .bind(limit)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        if dropped > 0 {
            tracing::debug!(dropped, "Room over capacity, dropped oldest messages");
        }

        Ok(record.into())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn list_by_room(&self, room_id: &str, now: OffsetDateTime) -> Result<Vec<Message>> {
        let records = sqlx::query_as::<_, MessageRecord>(
            r#"
            SELECT id, room_id, encrypted_content, sender_key, created_at, expires_at
            FROM messages
            WHERE room_id = $1
              AND expires_at > $2
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(room_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Into::into).collect())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn sweep_expired(&self, now: OffsetDateTime) -> Result<u64> {
        let result = sqlx::query("DELETE FROM messages WHERE expires_at <= $1").bind(now).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn prune_overflow(&self, limit: usize) -> Result<u64> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let result = sqlx::query(
            r#"
            DELETE FROM messages
            WHERE id IN (
                SELECT id FROM (
                    SELECT id, ROW_NUMBER() OVER (PARTITION BY room_id ORDER BY created_at DESC, id DESC) AS rn
                    FROM messages
                ) t WHERE t.rn > $1
            )
            "#,
        )
        .bind(limit)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn count_in_room(&self, room_id: &str) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE room_id = $1")
            .bind(room_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
