//! Route definitions for the `/notifications` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::notification;
use crate::state::AppState;

/// Routes mounted at `/notifications`.
///
/// ```text
/// GET    /                          -> list_notifications
/// POST   /read-all                  -> mark_all_read
/// GET    /unread-count              -> unread_count
/// POST   /{id}/read                 -> mark_read
/// POST   /broadcast                 -> broadcast (admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(notification::list_notifications))
        .route("/read-all", post(notification::mark_all_read))
        .route("/unread-count", get(notification::unread_count))
        .route("/{id}/read", post(notification::mark_read))
        .route("/broadcast", post(notification::broadcast))
}
