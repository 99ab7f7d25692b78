pub mod health;
pub mod invoice;
pub mod notification;
pub mod payment;
pub mod project;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /projects                                         list, create (admin)
/// /projects/{id}                                    get
/// /projects/{id}/manager                            assign manager (admin, PUT)
/// /projects/{id}/timeline                           timeline with budget
/// /projects/{id}/timeline/stages                    add stage (POST)
/// /projects/{id}/timeline/stages/{si}               edit, delete stage
/// /projects/{id}/timeline/stages/{si}/tasks         add task (POST)
/// /projects/{id}/timeline/stages/{si}/tasks/{ti}    edit, delete task
/// /projects/{id}/invoices/{invoice_id}              delete invoice
///
/// /invoices                                         list (?projectId=), create
/// /invoices/{id}                                    get
/// /invoices/{id}/status                             overwrite status (PUT)
///
/// /payments/verify                                  verify and settle (public)
///
/// /notifications                                    list
/// /notifications/unread-count                       unread count
/// /notifications/read-all                           mark all read (POST)
/// /notifications/{id}/read                          mark one read (POST)
/// /notifications/broadcast                          system alert (admin, POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/projects", project::router())
        .nest("/invoices", invoice::router())
        .nest("/payments", payment::router())
        .nest("/notifications", notification::router())
}
