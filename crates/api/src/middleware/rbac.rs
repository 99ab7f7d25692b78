//! Role-based access control (RBAC) extractors.
//!
//! Each extractor wraps [`AuthUser`] and rejects requests whose role does not
//! meet the minimum requirement. Per-project checks (membership, assigned
//! manager) happen in the handlers once the project is loaded.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use buildtrack_core::error::CoreError;
use buildtrack_core::roles::{ROLE_ADMIN, ROLE_PROJECT_MANAGER};

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Requires the `admin` role. Rejects with 403 Forbidden otherwise.
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != ROLE_ADMIN {
            return Err(AppError::Core(CoreError::Forbidden(
                "Admin role required".into(),
            )));
        }
        Ok(RequireAdmin(user))
    }
}

/// Requires `project_manager` or `admin` role. Rejects with 403 Forbidden
/// otherwise.
pub struct RequireManager(pub AuthUser);

impl FromRequestParts<AppState> for RequireManager {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != ROLE_ADMIN && user.role != ROLE_PROJECT_MANAGER {
            return Err(AppError::Core(CoreError::Forbidden(
                "Project manager or Admin role required".into(),
            )));
        }
        Ok(RequireManager(user))
    }
}
