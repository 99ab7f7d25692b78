use std::sync::Arc;

use buildtrack_payments::PaymentGateway;
use tokio::sync::Notify;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: buildtrack_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Gateway used to confirm payments before settling invoices.
    pub payments: Arc<dyn PaymentGateway>,
    /// Wakes the outbox dispatcher after a commit that enqueued events.
    pub outbox_wakeup: Arc<Notify>,
}

impl AppState {
    /// Nudge the outbox dispatcher so new events are delivered without
    /// waiting for the next poll.
    pub fn wake_outbox(&self) {
        self.outbox_wakeup.notify_one();
    }
}
