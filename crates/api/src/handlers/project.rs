//! Handlers for the `/projects` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use buildtrack_core::error::CoreError;
use buildtrack_core::notification::NotificationEvent;
use buildtrack_core::project::{ProjectAccess, ProjectStatus};
use buildtrack_core::roles::{ROLE_ADMIN, ROLE_PROJECT_MANAGER};
use buildtrack_core::types::{Date, DbId};
use buildtrack_core::validation::validate_input;
use buildtrack_db::models::project::{CreateProject, Project};
use buildtrack_db::models::user::User;
use buildtrack_db::repositories::{OutboxRepo, ProjectRepo, UserRepo};
use serde::Deserialize;
use validator::Validate;

use super::{load_authorized_project, load_project, project_clients};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /projects`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub address: Option<String>,
    pub status: Option<ProjectStatus>,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub budget: i64,
    pub start_date: Option<Date>,
    pub completion_date: Option<Date>,
    pub manager_id: Option<DbId>,
    #[serde(default)]
    pub client_ids: Vec<DbId>,
    #[serde(default)]
    pub success_manager_ids: Vec<DbId>,
}

/// Request body for `PUT /projects/{id}/manager`.
#[derive(Debug, Deserialize)]
pub struct AssignManagerRequest {
    pub manager_id: DbId,
}

/// GET /api/v1/projects
///
/// Admins see every project; everyone else sees the projects they belong to.
pub async fn list(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<Project>>>> {
    let projects = if auth.role == ROLE_ADMIN {
        ProjectRepo::list(&state.pool).await?
    } else {
        ProjectRepo::list_for_member(&state.pool, auth.user_id).await?
    };
    Ok(Json(DataResponse { data: projects }))
}

/// POST /api/v1/projects
///
/// A manager named in the request is assigned after creation so the
/// assignment notification fires the same way as through
/// `PUT /projects/{id}/manager`.
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateProjectRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Project>>)> {
    validate_input(&input)?;
    if let (Some(start), Some(end)) = (input.start_date, input.completion_date) {
        if end < start {
            return Err(AppError::Core(CoreError::Validation(format!(
                "completion_date {end} is before start_date {start}"
            ))));
        }
    }
    let manager = match input.manager_id {
        Some(id) => Some(find_manager(&state, id).await?),
        None => None,
    };

    let project = ProjectRepo::create(
        &state.pool,
        &CreateProject {
            name: input.name.trim().to_string(),
            address: input.address,
            status: input.status,
            budget: input.budget,
            start_date: input.start_date,
            completion_date: input.completion_date,
            manager_id: None,
            client_ids: input.client_ids,
            success_manager_ids: input.success_manager_ids,
        },
    )
    .await?;
    tracing::info!(project_id = project.id, admin_id = admin.user_id, "Project created");

    let project = match manager {
        Some(manager) => assign(&state, project, &manager, admin.user_id).await?,
        None => project,
    };

    Ok((StatusCode::CREATED, Json(DataResponse { data: project })))
}

/// GET /api/v1/projects/{id}
pub async fn get_by_id(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Project>>> {
    let project = load_authorized_project(&state.pool, &auth, id, ProjectAccess::View).await?;
    Ok(Json(DataResponse { data: project }))
}

/// PUT /api/v1/projects/{id}/manager
///
/// Reassigning the current manager is a no-op and sends nothing.
pub async fn assign_manager(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<AssignManagerRequest>,
) -> AppResult<Json<DataResponse<Project>>> {
    let project = load_project(&state.pool, id).await?;
    let manager = find_manager(&state, input.manager_id).await?;

    if project.manager_id == Some(manager.id) {
        return Ok(Json(DataResponse { data: project }));
    }

    let project = assign(&state, project, &manager, admin.user_id).await?;
    Ok(Json(DataResponse { data: project }))
}

/// Look up an active user who can manage projects.
async fn find_manager(state: &AppState, id: DbId) -> AppResult<User> {
    let user = UserRepo::find_by_id(&state.pool, id)
        .await?
        .filter(|u| u.is_active)
        .ok_or(AppError::Core(CoreError::NotFound { entity: "User", id }))?;
    if user.role != ROLE_PROJECT_MANAGER {
        return Err(AppError::Core(CoreError::Validation(format!(
            "User {id} is not a project manager"
        ))));
    }
    Ok(user)
}

/// Set the project's manager and record the assignment event in one
/// transaction.
async fn assign(
    state: &AppState,
    project: Project,
    manager: &User,
    actor_id: DbId,
) -> AppResult<Project> {
    let clients = project_clients(&state.pool, &project).await?;

    let mut tx = state.pool.begin().await?;
    let updated = ProjectRepo::assign_manager(&mut tx, project.id, manager.id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Project",
            id: project.id,
        }))?;
    let event = NotificationEvent::ManagerAssigned {
        project_id: updated.id,
        project_name: updated.name.clone(),
        manager: manager.recipient(),
        clients,
    };
    let event_id = OutboxRepo::enqueue(&mut tx, &event, Some(actor_id)).await?;
    tx.commit().await?;
    state.wake_outbox();

    tracing::info!(
        project_id = updated.id,
        manager_id = manager.id,
        event_id,
        "Project manager assigned",
    );
    Ok(updated)
}
