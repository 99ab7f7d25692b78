use axum::routing::post;
use axum::Router;

use crate::handlers::payment;
use crate::state::AppState;

/// Routes mounted at `/payments`. No authentication.
pub fn router() -> Router<AppState> {
    Router::new().route("/verify", post(payment::verify))
}
