//! Repository for the `projects` table.

use buildtrack_core::project::ProjectStatus;
use buildtrack_core::timeline::Stage;
use buildtrack_core::types::DbId;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::project::{CreateProject, Project};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, address, status, budget, start_date, completion_date, \
     manager_id, client_ids, success_manager_ids, task_timeline, timeline_version, \
     created_at, updated_at";

/// Provides CRUD operations for projects and their embedded timeline.
pub struct ProjectRepo;

impl ProjectRepo {
    /// Insert a new project with an empty timeline, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateProject) -> Result<Project, sqlx::Error> {
        let query = format!(
            "INSERT INTO projects
                (name, address, status, budget, start_date, completion_date,
                 manager_id, client_ids, success_manager_ids)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(&input.name)
            .bind(&input.address)
            .bind(input.status.unwrap_or(ProjectStatus::Pending).as_str())
            .bind(input.budget)
            .bind(input.start_date)
            .bind(input.completion_date)
            .bind(input.manager_id)
            .bind(&input.client_ids)
            .bind(&input.success_manager_ids)
            .fetch_one(pool)
            .await
    }

    /// Find a project by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects WHERE id = $1");
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all projects, most recently created first.
    pub async fn list(pool: &PgPool) -> Result<Vec<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects ORDER BY created_at DESC, id DESC");
        sqlx::query_as::<_, Project>(&query).fetch_all(pool).await
    }

    /// List projects the user manages, owns as a client, or supports as a
    /// success manager.
    pub async fn list_for_member(pool: &PgPool, user_id: DbId) -> Result<Vec<Project>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM projects
             WHERE manager_id = $1 OR $1 = ANY(client_ids) OR $1 = ANY(success_manager_ids)
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Replace the timeline if it is still at `expected_version`.
    ///
    /// Returns `None` when another writer got there first (or the project
    /// does not exist); the caller decides which.
    pub async fn update_timeline(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: DbId,
        expected_version: i64,
        stages: &[Stage],
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "UPDATE projects SET
                task_timeline = $3,
                timeline_version = timeline_version + 1
             WHERE id = $1 AND timeline_version = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(expected_version)
            .bind(Json(stages))
            .fetch_optional(&mut **tx)
            .await
    }

    /// Set the project's manager. Returns `None` if the project does not exist.
    pub async fn assign_manager(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: DbId,
        manager_id: DbId,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "UPDATE projects SET manager_id = $2 WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(manager_id)
            .fetch_optional(&mut **tx)
            .await
    }
}
