//! Handlers for the `/notifications` resource.
//!
//! All endpoints require authentication via [`AuthUser`]. A user sees
//! notifications addressed to them directly, to a list containing them,
//! to their role, or to everyone.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use buildtrack_core::error::CoreError;
use buildtrack_core::notification::{NotificationEvent, NotificationTarget};
use buildtrack_core::roles::validate_role;
use buildtrack_core::types::DbId;
use buildtrack_core::validation::validate_input;
use buildtrack_db::models::notification::UserNotification;
use buildtrack_db::repositories::{NotificationRepo, OutboxRepo};
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for `GET /notifications`.
#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    /// If `true`, return only unread notifications. Defaults to `false`.
    #[serde(alias = "unreadOnly")]
    pub unread_only: Option<bool>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}

/// Maximum page size for notification listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for notification listing.
const DEFAULT_LIMIT: i64 = 50;

/// Request body for `POST /notifications/broadcast`.
#[derive(Debug, Deserialize, Validate)]
pub struct BroadcastRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 5000))]
    pub body: String,
    /// Restrict the alert to one role; omitted means everyone.
    pub role: Option<String>,
}

/// GET /api/v1/notifications
pub async fn list_notifications(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<NotificationQuery>,
) -> AppResult<Json<DataResponse<Vec<UserNotification>>>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);
    let unread_only = params.unread_only.unwrap_or(false);

    let notifications = NotificationRepo::list_for_user(
        &state.pool,
        auth.user_id,
        &auth.role,
        unread_only,
        limit,
        offset,
    )
    .await?;

    Ok(Json(DataResponse {
        data: notifications,
    }))
}

/// POST /api/v1/notifications/{id}/read
///
/// Returns 204 No Content on success, or 404 if the notification is not
/// visible to the caller.
pub async fn mark_read(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(notification_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let found =
        NotificationRepo::mark_read(&state.pool, notification_id, auth.user_id, &auth.role)
            .await?;

    if !found {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Notification",
            id: notification_id,
        }));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/notifications/read-all
pub async fn mark_all_read(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<serde_json::Value>> {
    let count = NotificationRepo::mark_all_read(&state.pool, auth.user_id, &auth.role).await?;

    Ok(Json(serde_json::json!({
        "data": { "marked_read": count }
    })))
}

/// GET /api/v1/notifications/unread-count
pub async fn unread_count(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<serde_json::Value>> {
    let count = NotificationRepo::unread_count(&state.pool, auth.user_id, &auth.role).await?;

    Ok(Json(serde_json::json!({
        "data": { "count": count }
    })))
}

/// POST /api/v1/notifications/broadcast
///
/// Queues a system alert for a role or for everyone. Delivery happens in
/// the outbox dispatcher, so the response is 202 Accepted.
pub async fn broadcast(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<BroadcastRequest>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    validate_input(&input)?;
    let target = match input.role.as_deref().map(str::trim) {
        Some(role) if !role.is_empty() => {
            validate_role(role).map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;
            NotificationTarget::Role {
                role: role.to_string(),
            }
        }
        _ => NotificationTarget::Global,
    };

    let event = NotificationEvent::SystemAlert {
        title: input.title.trim().to_string(),
        body: input.body.trim().to_string(),
        target,
    };

    let mut tx = state.pool.begin().await?;
    let event_id = OutboxRepo::enqueue(&mut tx, &event, Some(admin.user_id)).await?;
    tx.commit().await?;
    state.wake_outbox();

    tracing::info!(event_id, admin_id = admin.user_id, "System alert queued");
    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "data": { "event_id": event_id } })),
    ))
}
