pub mod invoice;
pub mod notification;
pub mod payment;
pub mod project;
pub mod timeline;

use buildtrack_core::error::CoreError;
use buildtrack_core::notification::Recipient;
use buildtrack_core::project::{authorize, ProjectAccess};
use buildtrack_core::types::DbId;
use buildtrack_db::models::project::Project;
use buildtrack_db::repositories::{ProjectRepo, UserRepo};
use buildtrack_db::DbPool;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;

/// Load a project or fail with 404.
pub(crate) async fn load_project(pool: &DbPool, id: DbId) -> AppResult<Project> {
    ProjectRepo::find_by_id(pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Project",
            id,
        }))
}

/// Load a project and check the caller's access to it.
pub(crate) async fn load_authorized_project(
    pool: &DbPool,
    auth: &AuthUser,
    id: DbId,
    access: ProjectAccess,
) -> AppResult<Project> {
    let project = load_project(pool, id).await?;
    authorize(auth.user_id, &auth.role, &project.members(), access)?;
    Ok(project)
}

/// Active client accounts attached to a project, as notification recipients.
pub(crate) async fn project_clients(
    pool: &DbPool,
    project: &Project,
) -> Result<Vec<Recipient>, sqlx::Error> {
    let users = UserRepo::find_active_by_ids(pool, &project.client_ids).await?;
    Ok(users.iter().map(|u| u.recipient()).collect())
}
