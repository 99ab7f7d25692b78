//! Outbox event model.

use buildtrack_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `outbox_events` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OutboxEvent {
    pub id: DbId,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub actor_user_id: Option<DbId>,
    pub attempts: i32,
    pub last_error: Option<String>,
    /// `None` once the event has exhausted its retries.
    pub next_attempt_at: Option<Timestamp>,
    pub processed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Unprocessed outbox events, split by whether they will be retried.
#[derive(Debug, Clone, Copy, FromRow, Serialize)]
pub struct OutboxBacklog {
    /// Events waiting for a first or further delivery attempt.
    pub pending: i64,
    /// Events whose retries are exhausted.
    pub dead_letters: i64,
}
