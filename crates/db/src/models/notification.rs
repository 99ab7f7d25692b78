//! Notification entity models.

use buildtrack_core::notification::NotificationKind;
use buildtrack_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A notification as seen by one user, with that user's read state.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserNotification {
    pub id: DbId,
    pub title: String,
    pub body: String,
    #[sqlx(try_from = "String")]
    pub kind: NotificationKind,
    pub related_id: Option<String>,
    pub project_id: Option<DbId>,
    pub action_url: Option<String>,
    pub is_read: bool,
    pub read_at: Option<Timestamp>,
    pub created_at: Timestamp,
}
