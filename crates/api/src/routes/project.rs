//! Route definitions for `/projects`, including the nested timeline and
//! project-scoped invoice deletion.

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::handlers::{invoice, project, timeline};
use crate::state::AppState;

/// Routes mounted at `/projects`.
///
/// ```text
/// GET    /                                     -> list
/// POST   /                                     -> create
/// GET    /{id}                                 -> get_by_id
/// PUT    /{id}/manager                         -> assign_manager
/// GET    /{id}/timeline                        -> get_timeline
/// POST   /{id}/timeline/stages                 -> add_stage
/// PUT    /{id}/timeline/stages/{si}            -> edit_stage
/// DELETE /{id}/timeline/stages/{si}            -> delete_stage
/// POST   /{id}/timeline/stages/{si}/tasks      -> add_task
/// PUT    /{id}/timeline/stages/{si}/tasks/{ti} -> edit_task
/// DELETE /{id}/timeline/stages/{si}/tasks/{ti} -> delete_task
/// DELETE /{id}/invoices/{invoice_id}           -> invoice::delete
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(project::list).post(project::create))
        .route("/{id}", get(project::get_by_id))
        .route("/{id}/manager", put(project::assign_manager))
        .route("/{id}/timeline", get(timeline::get_timeline))
        .route("/{id}/timeline/stages", post(timeline::add_stage))
        .route(
            "/{id}/timeline/stages/{si}",
            put(timeline::edit_stage).delete(timeline::delete_stage),
        )
        .route("/{id}/timeline/stages/{si}/tasks", post(timeline::add_task))
        .route(
            "/{id}/timeline/stages/{si}/tasks/{ti}",
            put(timeline::edit_task).delete(timeline::delete_task),
        )
        .route("/{id}/invoices/{invoice_id}", delete(invoice::delete))
}
