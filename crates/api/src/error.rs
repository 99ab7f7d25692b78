use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use buildtrack_core::error::CoreError;
use buildtrack_payments::PaymentError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses of
/// the form `{ "status": "error", "code", "message", "details"? }`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `buildtrack_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The payment gateway could not confirm a transaction.
    #[error("Payment gateway error: {0}")]
    Payment(#[from] PaymentError),

    /// A lookup by something other than an id found nothing.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

type Classified = (StatusCode, &'static str, String, Option<serde_json::Value>);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details): Classified = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                    None,
                ),
                CoreError::Validation(msg) => (
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    msg.clone(),
                    None,
                ),
                CoreError::BudgetExceeded {
                    stage_budget,
                    attempted_total,
                    available,
                } => (
                    StatusCode::BAD_REQUEST,
                    "BUDGET_EXCEEDED",
                    core.to_string(),
                    Some(json!({
                        "stage_budget": stage_budget,
                        "attempted_total": attempted_total,
                        "available": available,
                    })),
                ),
                CoreError::AmountMismatch { expected, verified } => (
                    StatusCode::BAD_REQUEST,
                    "AMOUNT_MISMATCH",
                    core.to_string(),
                    Some(json!({ "expected": expected, "verified": verified })),
                ),
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone(), None),
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone(), None)
                }
                CoreError::Forbidden(msg) => {
                    (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone(), None)
                }
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal()
                }
            },

            // --- Database errors ---
            AppError::Database(err) => classify_sqlx_error(err),

            // --- Payment gateway ---
            AppError::Payment(err) => {
                tracing::error!(error = %err, "Payment verification failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PAYMENT_GATEWAY_ERROR",
                    "Could not verify the payment with the gateway".to_string(),
                    None,
                )
            }

            // --- HTTP-specific errors ---
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone(), None),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone(), None)
            }
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let mut body = json!({
            "status": "error",
            "code": code,
            "message": message,
        });
        if let Some(details) = details {
            body["details"] = details;
        }

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> Classified {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
        None,
    )
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (constraint name starting with `uq_`) map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> Classified {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
            None,
        ),
        sqlx::Error::Database(db_err) => {
            // PostgreSQL unique constraint violation: error code 23505
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                        None,
                    );
                }
            }
            tracing::error!(error = %db_err, "Database error");
            internal()
        }
        other => {
            tracing::error!(error = %other, "Database error");
            internal()
        }
    }
}
