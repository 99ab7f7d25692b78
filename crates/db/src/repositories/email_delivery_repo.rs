//! Repository for the `email_deliveries` table.

use buildtrack_core::types::DbId;
use sqlx::PgPool;

/// Remembers which emails of an outbox event have been sent, so a retried
/// event never mails the same recipient twice.
pub struct EmailDeliveryRepo;

impl EmailDeliveryRepo {
    pub async fn is_delivered(
        pool: &PgPool,
        outbox_event_id: DbId,
        recipient: &str,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT 1 FROM email_deliveries
                WHERE outbox_event_id = $1 AND recipient = $2
             )",
        )
        .bind(outbox_event_id)
        .bind(recipient)
        .fetch_one(pool)
        .await
    }

    /// Record a sent email. Recording the same delivery twice is a no-op.
    pub async fn record(
        pool: &PgPool,
        outbox_event_id: DbId,
        recipient: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO email_deliveries (outbox_event_id, recipient) VALUES ($1, $2) \
             ON CONFLICT ON CONSTRAINT uq_email_deliveries_event_recipient DO NOTHING",
        )
        .bind(outbox_event_id)
        .bind(recipient)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Number of recorded deliveries for an event.
    pub async fn count_for_event(pool: &PgPool, outbox_event_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM email_deliveries WHERE outbox_event_id = $1")
            .bind(outbox_event_id)
            .fetch_one(pool)
            .await
    }
}
