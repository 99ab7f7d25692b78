use axum::routing::{get, put};
use axum::Router;

use crate::handlers::invoice;
use crate::state::AppState;

/// Routes mounted at `/invoices`.
///
/// ```text
/// GET    /?projectId=     -> list
/// POST   /                -> create
/// GET    /{id}            -> get_by_id
/// PUT    /{id}/status     -> update_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(invoice::list).post(invoice::create))
        .route("/{id}", get(invoice::get_by_id))
        .route("/{id}/status", put(invoice::update_status))
}
