//! Liveness endpoint, mounted at the root rather than under `/api/v1`.

use axum::extract::State;
use axum::{routing::get, Json, Router};
use buildtrack_db::models::outbox::OutboxBacklog;
use buildtrack_db::repositories::OutboxRepo;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the database cannot be reached.
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
    /// Notification and email work still owed; absent when the database is
    /// down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outbox: Option<OutboxBacklog>,
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = buildtrack_db::health_check(&state.pool).await.is_ok();
    let outbox = if db_healthy {
        OutboxRepo::backlog(&state.pool)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Could not read outbox backlog"))
            .ok()
    } else {
        None
    };

    if let Some(backlog) = outbox.filter(|b| b.dead_letters > 0) {
        tracing::warn!(dead_letters = backlog.dead_letters, "Outbox has undeliverable events");
    }

    Json(HealthResponse {
        status: if db_healthy { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        outbox,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
