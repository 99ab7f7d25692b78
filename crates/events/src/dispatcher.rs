//! Outbox dispatcher.
//!
//! [`OutboxDispatcher`] runs as a background task. Each pass claims due rows
//! from `outbox_events`, turns every event into its notification records and
//! emails, and marks it processed. A failed event is retried after
//! [`RETRY_DELAYS_SECS`]; once those are exhausted it stays in the table as a
//! dead letter with its last error.
//!
//! Processing an event twice is harmless: notifications are unique per
//! `(source_event_id, dedupe_key)` and sent emails are recorded in
//! `email_deliveries` before the event is marked processed.

use std::sync::Arc;
use std::time::Duration;

use buildtrack_core::email::plan_emails;
use buildtrack_core::notification::NotificationEvent;
use buildtrack_db::models::outbox::OutboxEvent;
use buildtrack_db::repositories::{EmailDeliveryRepo, NotificationRepo, OutboxRepo};
use buildtrack_db::DbPool;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::delivery::email::{EmailError, Mailer};

/// Delay before each retry, indexed by the number of failed attempts so far.
pub const RETRY_DELAYS_SECS: [i64; 4] = [30, 120, 600, 3600];

/// Delay before the next attempt after `failed_attempts` failures, or `None`
/// when the event should be given up on.
pub fn retry_delay(failed_attempts: i32) -> Option<chrono::Duration> {
    let index = usize::try_from(failed_attempts.max(1) - 1).ok()?;
    RETRY_DELAYS_SECS
        .get(index)
        .map(|secs| chrono::Duration::seconds(*secs))
}

// ---------------------------------------------------------------------------
// Errors and config
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Malformed outbox payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("{failed} of {attempted} emails failed, last error: {last}")]
    Email {
        failed: usize,
        attempted: usize,
        last: EmailError,
    },
}

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// How long to sleep between passes when nothing wakes the dispatcher.
    pub poll_interval: Duration,
    /// Maximum events claimed per pass.
    pub batch_size: i64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(15),
            batch_size: 50,
        }
    }
}

/// Counts from one dispatch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub processed: usize,
    pub failed: usize,
}

// ---------------------------------------------------------------------------
// OutboxDispatcher
// ---------------------------------------------------------------------------

pub struct OutboxDispatcher {
    pool: DbPool,
    mailer: Arc<dyn Mailer>,
    config: DispatcherConfig,
    wakeup: Arc<Notify>,
}

impl OutboxDispatcher {
    pub fn new(
        pool: DbPool,
        mailer: Arc<dyn Mailer>,
        config: DispatcherConfig,
        wakeup: Arc<Notify>,
    ) -> Self {
        Self {
            pool,
            mailer,
            config,
            wakeup,
        }
    }

    /// Run until `cancel` fires.
    ///
    /// A pass runs on every poll tick and whenever a writer signals the
    /// shared [`Notify`] after committing new events.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Outbox dispatcher cancelled");
                    break;
                }
                _ = interval.tick() => {}
                _ = self.wakeup.notified() => {}
            }

            match self.process_due().await {
                Ok(stats) if stats.processed + stats.failed > 0 => {
                    tracing::debug!(
                        processed = stats.processed,
                        failed = stats.failed,
                        "Outbox pass complete"
                    );
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Failed to claim outbox events"),
            }
        }
    }

    /// Claim and process one batch of due events.
    pub async fn process_due(&self) -> Result<DispatchStats, DispatchError> {
        let events = OutboxRepo::claim_due(&self.pool, self.config.batch_size).await?;
        let mut stats = DispatchStats::default();

        for event in &events {
            match self.process_event(event).await {
                Ok(()) => {
                    OutboxRepo::mark_processed(&self.pool, event.id).await?;
                    stats.processed += 1;
                }
                Err(e) => {
                    stats.failed += 1;
                    self.record_failure(event, &e).await?;
                }
            }
        }

        Ok(stats)
    }

    async fn record_failure(
        &self,
        event: &OutboxEvent,
        error: &DispatchError,
    ) -> Result<(), DispatchError> {
        let failed_attempts = event.attempts + 1;
        let retry_at = retry_delay(failed_attempts).map(|d| chrono::Utc::now() + d);

        match retry_at {
            Some(at) => tracing::warn!(
                outbox_event_id = event.id,
                event_type = %event.event_type,
                attempt = failed_attempts,
                retry_at = %at,
                error = %error,
                "Outbox event failed, will retry"
            ),
            None => tracing::error!(
                outbox_event_id = event.id,
                event_type = %event.event_type,
                attempt = failed_attempts,
                error = %error,
                "Outbox event failed permanently"
            ),
        }

        OutboxRepo::mark_failed(&self.pool, event.id, &error.to_string(), retry_at).await?;
        Ok(())
    }

    /// Store the event's notifications and send its emails.
    async fn process_event(&self, event: &OutboxEvent) -> Result<(), DispatchError> {
        let payload: NotificationEvent = serde_json::from_value(event.payload.clone())?;

        let drafts = payload.notifications();
        let mut tx = self.pool.begin().await?;
        let mut created = 0usize;
        for draft in &drafts {
            if NotificationRepo::create_from_event(&mut tx, event.id, draft)
                .await?
                .is_some()
            {
                created += 1;
            }
        }
        tx.commit().await?;

        let emails = plan_emails(&payload);
        let mut failed = 0usize;
        let mut last_error = None;
        for email in &emails {
            if EmailDeliveryRepo::is_delivered(&self.pool, event.id, &email.to).await? {
                continue;
            }
            match self.mailer.send(email).await {
                Ok(()) => EmailDeliveryRepo::record(&self.pool, event.id, &email.to).await?,
                Err(e) => {
                    tracing::warn!(
                        outbox_event_id = event.id,
                        to = %email.to,
                        error = %e,
                        "Email delivery failed"
                    );
                    failed += 1;
                    last_error = Some(e);
                }
            }
        }

        tracing::info!(
            outbox_event_id = event.id,
            event_type = %event.event_type,
            notifications = created,
            emails = emails.len() - failed,
            "Outbox event dispatched"
        );

        match last_error {
            Some(last) => Err(DispatchError::Email {
                failed,
                attempted: emails.len(),
                last,
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retries_follow_the_backoff_schedule() {
        assert_eq!(retry_delay(1), Some(chrono::Duration::seconds(30)));
        assert_eq!(retry_delay(2), Some(chrono::Duration::seconds(120)));
        assert_eq!(retry_delay(3), Some(chrono::Duration::seconds(600)));
        assert_eq!(retry_delay(4), Some(chrono::Duration::seconds(3600)));
    }

    #[test]
    fn gives_up_after_the_last_delay() {
        assert_eq!(retry_delay(5), None);
        assert_eq!(retry_delay(42), None);
    }

    #[test]
    fn zero_attempts_uses_first_delay() {
        assert_eq!(retry_delay(0), Some(chrono::Duration::seconds(30)));
    }
}
