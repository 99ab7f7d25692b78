//! Repository for the `notifications` and `notification_reads` tables.

use buildtrack_core::notification::{NotificationDraft, NotificationTarget};
use buildtrack_core::types::DbId;
use sqlx::PgPool;

use crate::models::notification::UserNotification;

/// Predicate matching every targeting mode that reaches user `$1` with role `$2`.
const VISIBLE_TO_USER: &str = "(n.recipient_id = $1 \
     OR $1 = ANY(n.recipient_ids) \
     OR n.recipient_role = $2 \
     OR n.is_global)";

/// Stores notifications and per-user read state.
pub struct NotificationRepo;

impl NotificationRepo {
    /// Insert a notification produced by outbox event `source_event_id`.
    ///
    /// Returns `None` when the same event already produced a notification
    /// with the same dedupe key.
    pub async fn create_from_event(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        source_event_id: DbId,
        draft: &NotificationDraft,
    ) -> Result<Option<DbId>, sqlx::Error> {
        let (recipient_id, recipient_ids, recipient_role, is_global) = match &draft.target {
            NotificationTarget::User { user_id } => (Some(*user_id), Vec::new(), None, false),
            NotificationTarget::Users { user_ids } => (None, user_ids.clone(), None, false),
            NotificationTarget::Role { role } => (None, Vec::new(), Some(role.as_str()), false),
            NotificationTarget::Global => (None, Vec::new(), None, true),
        };

        sqlx::query_scalar(
            "INSERT INTO notifications
                (title, body, kind, recipient_id, recipient_ids, recipient_role, is_global,
                 related_id, project_id, action_url, source_event_id, dedupe_key)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             ON CONFLICT ON CONSTRAINT uq_notifications_source_dedupe DO NOTHING
             RETURNING id",
        )
        .bind(&draft.title)
        .bind(&draft.body)
        .bind(draft.kind.as_str())
        .bind(recipient_id)
        .bind(recipient_ids)
        .bind(recipient_role)
        .bind(is_global)
        .bind(&draft.related_id)
        .bind(draft.project_id)
        .bind(&draft.action_url)
        .bind(source_event_id)
        .bind(draft.dedupe_key)
        .fetch_optional(&mut **tx)
        .await
    }

    /// List notifications visible to a user, newest first.
    ///
    /// When `unread_only` is `true`, notifications the user has read are
    /// skipped.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        role: &str,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<UserNotification>, sqlx::Error> {
        let query = format!(
            "SELECT n.id, n.title, n.body, n.kind, n.related_id, n.project_id, n.action_url,
                    (r.id IS NOT NULL) AS is_read, r.read_at, n.created_at
             FROM notifications n
             LEFT JOIN notification_reads r
                ON r.notification_id = n.id AND r.user_id = $1
             WHERE {VISIBLE_TO_USER}
               AND ($3 = false OR r.id IS NULL)
             ORDER BY n.created_at DESC, n.id DESC
             LIMIT $4 OFFSET $5"
        );
        sqlx::query_as::<_, UserNotification>(&query)
            .bind(user_id)
            .bind(role)
            .bind(unread_only)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Count notifications the user has not read yet.
    pub async fn unread_count(pool: &PgPool, user_id: DbId, role: &str) -> Result<i64, sqlx::Error> {
        let query = format!(
            "SELECT COUNT(*) FROM notifications n
             WHERE {VISIBLE_TO_USER}
               AND NOT EXISTS (
                   SELECT 1 FROM notification_reads r
                   WHERE r.notification_id = n.id AND r.user_id = $1
               )"
        );
        sqlx::query_scalar(&query)
            .bind(user_id)
            .bind(role)
            .fetch_one(pool)
            .await
    }

    /// Mark one notification read for the user.
    ///
    /// Returns `false` if the notification does not exist or is not visible
    /// to the user. Marking an already-read notification succeeds.
    pub async fn mark_read(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
        role: &str,
    ) -> Result<bool, sqlx::Error> {
        let visible_query = format!(
            "SELECT EXISTS (SELECT 1 FROM notifications n WHERE n.id = $3 AND {VISIBLE_TO_USER})"
        );
        let visible: bool = sqlx::query_scalar(&visible_query)
            .bind(user_id)
            .bind(role)
            .bind(id)
            .fetch_one(pool)
            .await?;
        if !visible {
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO notification_reads (notification_id, user_id) VALUES ($1, $2) \
             ON CONFLICT ON CONSTRAINT uq_notification_reads_notification_user DO NOTHING",
        )
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(true)
    }

    /// Mark every visible notification read. Returns how many changed.
    pub async fn mark_all_read(pool: &PgPool, user_id: DbId, role: &str) -> Result<u64, sqlx::Error> {
        let query = format!(
            "INSERT INTO notification_reads (notification_id, user_id)
             SELECT n.id, $1 FROM notifications n
             WHERE {VISIBLE_TO_USER}
             ON CONFLICT ON CONSTRAINT uq_notification_reads_notification_user DO NOTHING"
        );
        let result = sqlx::query(&query)
            .bind(user_id)
            .bind(role)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Number of notifications produced by an outbox event.
    pub async fn count_for_event(pool: &PgPool, source_event_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE source_event_id = $1")
            .bind(source_event_id)
            .fetch_one(pool)
            .await
    }
}
