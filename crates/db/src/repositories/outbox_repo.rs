//! Repository for the `outbox_events` table.

use buildtrack_core::notification::NotificationEvent;
use buildtrack_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::outbox::{OutboxBacklog, OutboxEvent};

const COLUMNS: &str = "id, event_type, payload, actor_user_id, attempts, last_error, \
     next_attempt_at, processed_at, created_at, updated_at";

/// How long a claimed event stays invisible to other dispatchers.
const CLAIM_LEASE_SECS: i64 = 300;

/// Stores side-effect events and hands them to the dispatcher.
pub struct OutboxRepo;

impl OutboxRepo {
    /// Append an event inside the transaction that performs the state change.
    pub async fn enqueue(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        event: &NotificationEvent,
        actor_user_id: Option<DbId>,
    ) -> Result<DbId, sqlx::Error> {
        let payload = serde_json::to_value(event)
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
        sqlx::query_scalar(
            "INSERT INTO outbox_events (event_type, payload, actor_user_id) \
             VALUES ($1, $2, $3) \
             RETURNING id",
        )
        .bind(event.event_type())
        .bind(payload)
        .bind(actor_user_id)
        .fetch_one(&mut **tx)
        .await
    }

    /// Claim up to `limit` due events, oldest first.
    ///
    /// Claimed rows are leased by pushing `next_attempt_at` forward, so
    /// concurrent dispatchers never pick the same event.
    pub async fn claim_due(pool: &PgPool, limit: i64) -> Result<Vec<OutboxEvent>, sqlx::Error> {
        let query = format!(
            "UPDATE outbox_events SET next_attempt_at = NOW() + make_interval(secs => $2)
             WHERE id IN (
                 SELECT id FROM outbox_events
                 WHERE processed_at IS NULL
                   AND next_attempt_at IS NOT NULL
                   AND next_attempt_at <= NOW()
                 ORDER BY id
                 LIMIT $1
                 FOR UPDATE SKIP LOCKED
             )
             RETURNING {COLUMNS}"
        );
        let mut events = sqlx::query_as::<_, OutboxEvent>(&query)
            .bind(limit)
            .bind(CLAIM_LEASE_SECS as f64)
            .fetch_all(pool)
            .await?;
        events.sort_by_key(|e| e.id);
        Ok(events)
    }

    /// Record successful processing.
    pub async fn mark_processed(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE outbox_events SET processed_at = NOW(), last_error = NULL WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Record a failed attempt. `retry_at = None` leaves the event as a dead
    /// letter that is never claimed again.
    pub async fn mark_failed(
        pool: &PgPool,
        id: DbId,
        error: &str,
        retry_at: Option<Timestamp>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE outbox_events SET
                attempts = attempts + 1,
                last_error = $2,
                next_attempt_at = $3
             WHERE id = $1",
        )
        .bind(id)
        .bind(error)
        .bind(retry_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<OutboxEvent>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM outbox_events WHERE id = $1");
        sqlx::query_as::<_, OutboxEvent>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Events that have not been processed yet, including dead letters.
    pub async fn list_pending(pool: &PgPool) -> Result<Vec<OutboxEvent>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM outbox_events WHERE processed_at IS NULL ORDER BY id"
        );
        sqlx::query_as::<_, OutboxEvent>(&query).fetch_all(pool).await
    }

    /// Size of the unprocessed backlog.
    pub async fn backlog(pool: &PgPool) -> Result<OutboxBacklog, sqlx::Error> {
        sqlx::query_as::<_, OutboxBacklog>(
            "SELECT COUNT(*) FILTER (WHERE next_attempt_at IS NOT NULL) AS pending,
                    COUNT(*) FILTER (WHERE next_attempt_at IS NULL) AS dead_letters
             FROM outbox_events
             WHERE processed_at IS NULL",
        )
        .fetch_one(pool)
        .await
    }
}
