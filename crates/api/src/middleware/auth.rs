//! Request principal taken from the `Authorization` header.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use buildtrack_core::error::CoreError;
use buildtrack_core::roles::validate_role;
use buildtrack_core::types::DbId;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// The caller of a request, as named by its Bearer token.
///
/// Handlers that act for a user take it as an argument; project membership
/// is checked against it per request, never looked up from ambient state.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: DbId,
    /// One of the roles in [`buildtrack_core::roles`].
    pub role: String,
}

fn unauthorized(message: &str) -> AppError {
    AppError::Core(CoreError::Unauthorized(message.into()))
}

/// The token part of `Authorization: Bearer <token>`.
fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| unauthorized("Missing Authorization header"))?;
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| unauthorized("Invalid Authorization format. Expected: Bearer <token>"))
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = validate_token(token, &state.config.jwt)
            .map_err(|_| unauthorized("Invalid or expired token"))?;

        if validate_role(&claims.role).is_err() {
            tracing::warn!(user_id = claims.sub, role = %claims.role, "Token carries an unknown role");
            return Err(unauthorized("Token carries an unknown role"));
        }

        Ok(AuthUser {
            user_id: claims.sub,
            role: claims.role,
        })
    }
}
