//! Handlers for `/projects/{id}/timeline`.
//!
//! Every mutation follows the same shape: load the project, apply a pure
//! timeline operation to a copy of its stages, then write the result back
//! guarded by the version that was read. A completion edge records a
//! notification event in the same transaction.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use buildtrack_core::budget::{compute_budget, BudgetSummary};
use buildtrack_core::error::CoreError;
use buildtrack_core::notification::NotificationEvent;
use buildtrack_core::project::ProjectAccess;
use buildtrack_core::timeline::{self, ItemDraft, Stage};
use buildtrack_core::types::DbId;
use buildtrack_db::models::project::Project;
use buildtrack_db::repositories::{OutboxRepo, ProjectRepo};
use serde::Serialize;

use super::{load_authorized_project, project_clients};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireManager;
use crate::query::TimelineMutationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// A timeline as returned to clients, with its budget roll-up.
#[derive(Debug, Serialize)]
pub struct TimelineView {
    pub project_id: DbId,
    pub version: i64,
    pub stages: Vec<Stage>,
    pub budget: BudgetSummary,
    /// Identifier of the stage or task a create request added.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
}

impl TimelineView {
    fn of(project: Project, item_id: Option<String>) -> Self {
        let stages = project.task_timeline.0;
        Self {
            project_id: project.id,
            version: project.timeline_version,
            budget: compute_budget(&stages),
            stages,
            item_id,
        }
    }
}

/// A stage or task that moved to `Completed` in an edit.
enum Completion {
    Stage {
        id: String,
        name: String,
    },
    Task {
        stage_name: String,
        id: String,
        name: String,
    },
}

type Applied<T> = Result<(T, Option<Completion>), CoreError>;

fn stale_timeline() -> AppError {
    AppError::Core(CoreError::Conflict(
        "Timeline was modified by another request; reload and retry".into(),
    ))
}

/// Read, mutate, and conditionally write a project's timeline.
async fn apply<T>(
    state: &AppState,
    auth: &AuthUser,
    project_id: DbId,
    params: &TimelineMutationParams,
    mutate: impl FnOnce(&mut Vec<Stage>) -> Applied<T>,
) -> AppResult<(Project, T)> {
    let project =
        load_authorized_project(&state.pool, auth, project_id, ProjectAccess::Manage).await?;
    if let Some(expected) = params.expected_version {
        if expected != project.timeline_version {
            return Err(stale_timeline());
        }
    }

    let mut stages = project.task_timeline.0.clone();
    let (value, completion) = mutate(&mut stages)?;

    let event = match completion {
        Some(completion) => Some(completion_event(state, &project, completion).await),
        None => None,
    };

    let mut tx = state.pool.begin().await?;
    let updated =
        ProjectRepo::update_timeline(&mut tx, project.id, project.timeline_version, &stages)
            .await?
            .ok_or_else(stale_timeline)?;
    if let Some(event) = &event {
        let event_id = OutboxRepo::enqueue(&mut tx, event, Some(auth.user_id)).await?;
        tracing::info!(project_id, event_id, event_type = event.event_type(), "Completion recorded");
    }
    tx.commit().await?;

    if event.is_some() {
        state.wake_outbox();
    }
    Ok((updated, value))
}

/// Build the notification event for a completion edge.
///
/// Failing to resolve the client list leaves the event without recipients
/// rather than failing the edit.
async fn completion_event(
    state: &AppState,
    project: &Project,
    completion: Completion,
) -> NotificationEvent {
    let clients = project_clients(&state.pool, project)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(project_id = project.id, error = %e, "Could not resolve project clients");
            Vec::new()
        });

    match completion {
        Completion::Stage { id, name } => NotificationEvent::PhaseCompleted {
            project_id: project.id,
            project_name: project.name.clone(),
            stage_id: id,
            stage_name: name,
            clients,
        },
        Completion::Task {
            stage_name,
            id,
            name,
        } => NotificationEvent::TaskCompleted {
            project_id: project.id,
            project_name: project.name.clone(),
            stage_name,
            task_id: id,
            task_name: name,
            clients,
        },
    }
}

fn require_confirmation(params: &TimelineMutationParams, what: &str) -> AppResult<()> {
    if params.confirm {
        Ok(())
    } else {
        Err(AppError::Core(CoreError::Validation(format!(
            "Deleting a {what} requires confirm=true"
        ))))
    }
}

/// GET /api/v1/projects/{id}/timeline
pub async fn get_timeline(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
) -> AppResult<Json<DataResponse<TimelineView>>> {
    let project =
        load_authorized_project(&state.pool, &auth, project_id, ProjectAccess::View).await?;
    Ok(Json(DataResponse {
        data: TimelineView::of(project, None),
    }))
}

/// POST /api/v1/projects/{id}/timeline/stages
pub async fn add_stage(
    RequireManager(auth): RequireManager,
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
    Query(params): Query<TimelineMutationParams>,
    Json(draft): Json<ItemDraft>,
) -> AppResult<(StatusCode, Json<DataResponse<TimelineView>>)> {
    let item_id = timeline::new_item_id();
    let id = item_id.clone();
    let (project, _) = apply(&state, &auth, project_id, &params, |stages| {
        Ok((timeline::add_stage(stages, &draft, id)?, None))
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: TimelineView::of(project, Some(item_id)),
        }),
    ))
}

/// PUT /api/v1/projects/{id}/timeline/stages/{si}
pub async fn edit_stage(
    RequireManager(auth): RequireManager,
    State(state): State<AppState>,
    Path((project_id, stage_index)): Path<(DbId, usize)>,
    Query(params): Query<TimelineMutationParams>,
    Json(draft): Json<ItemDraft>,
) -> AppResult<Json<DataResponse<TimelineView>>> {
    let (project, _) = apply(&state, &auth, project_id, &params, |stages| {
        let outcome = timeline::edit_stage(stages, stage_index, &draft)?;
        let stage = &stages[stage_index];
        let completion = outcome.newly_completed.then(|| Completion::Stage {
            id: stage.id.clone(),
            name: stage.name.clone(),
        });
        Ok(((), completion))
    })
    .await?;

    Ok(Json(DataResponse {
        data: TimelineView::of(project, None),
    }))
}

/// DELETE /api/v1/projects/{id}/timeline/stages/{si}?confirm=true
pub async fn delete_stage(
    RequireManager(auth): RequireManager,
    State(state): State<AppState>,
    Path((project_id, stage_index)): Path<(DbId, usize)>,
    Query(params): Query<TimelineMutationParams>,
) -> AppResult<Json<DataResponse<TimelineView>>> {
    require_confirmation(&params, "stage")?;
    let (project, removed) = apply(&state, &auth, project_id, &params, |stages| {
        Ok((timeline::delete_stage(stages, stage_index)?, None))
    })
    .await?;

    tracing::info!(
        project_id,
        stage_id = %removed.id,
        tasks = removed.tasks.len(),
        "Stage deleted",
    );
    Ok(Json(DataResponse {
        data: TimelineView::of(project, None),
    }))
}

/// POST /api/v1/projects/{id}/timeline/stages/{si}/tasks
pub async fn add_task(
    RequireManager(auth): RequireManager,
    State(state): State<AppState>,
    Path((project_id, stage_index)): Path<(DbId, usize)>,
    Query(params): Query<TimelineMutationParams>,
    Json(draft): Json<ItemDraft>,
) -> AppResult<(StatusCode, Json<DataResponse<TimelineView>>)> {
    let item_id = timeline::new_item_id();
    let id = item_id.clone();
    let (project, _) = apply(&state, &auth, project_id, &params, |stages| {
        Ok((timeline::add_task(stages, stage_index, &draft, id)?, None))
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: TimelineView::of(project, Some(item_id)),
        }),
    ))
}

/// PUT /api/v1/projects/{id}/timeline/stages/{si}/tasks/{ti}
pub async fn edit_task(
    RequireManager(auth): RequireManager,
    State(state): State<AppState>,
    Path((project_id, stage_index, task_index)): Path<(DbId, usize, usize)>,
    Query(params): Query<TimelineMutationParams>,
    Json(draft): Json<ItemDraft>,
) -> AppResult<Json<DataResponse<TimelineView>>> {
    let (project, _) = apply(&state, &auth, project_id, &params, |stages| {
        let outcome = timeline::edit_task(stages, stage_index, task_index, &draft)?;
        let stage = &stages[stage_index];
        let task = &stage.tasks[task_index];
        let completion = outcome.newly_completed.then(|| Completion::Task {
            stage_name: stage.name.clone(),
            id: task.id.clone(),
            name: task.name.clone(),
        });
        Ok(((), completion))
    })
    .await?;

    Ok(Json(DataResponse {
        data: TimelineView::of(project, None),
    }))
}

/// DELETE /api/v1/projects/{id}/timeline/stages/{si}/tasks/{ti}?confirm=true
pub async fn delete_task(
    RequireManager(auth): RequireManager,
    State(state): State<AppState>,
    Path((project_id, stage_index, task_index)): Path<(DbId, usize, usize)>,
    Query(params): Query<TimelineMutationParams>,
) -> AppResult<Json<DataResponse<TimelineView>>> {
    require_confirmation(&params, "task")?;
    let (project, removed) = apply(&state, &auth, project_id, &params, |stages| {
        Ok((timeline::delete_task(stages, stage_index, task_index)?, None))
    })
    .await?;

    tracing::info!(project_id, task_id = %removed.id, "Task deleted");
    Ok(Json(DataResponse {
        data: TimelineView::of(project, None),
    }))
}
