//! Project entity model and DTOs.

use buildtrack_core::project::{ProjectMembers, ProjectStatus};
use buildtrack_core::timeline::Stage;
use buildtrack_core::types::{Date, DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `projects` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Project {
    pub id: DbId,
    pub name: String,
    pub address: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: ProjectStatus,
    pub budget: i64,
    pub start_date: Option<Date>,
    pub completion_date: Option<Date>,
    pub manager_id: Option<DbId>,
    pub client_ids: Vec<DbId>,
    pub success_manager_ids: Vec<DbId>,
    pub task_timeline: Json<Vec<Stage>>,
    pub timeline_version: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Project {
    pub fn members(&self) -> ProjectMembers<'_> {
        ProjectMembers {
            manager_id: self.manager_id,
            client_ids: &self.client_ids,
            success_manager_ids: &self.success_manager_ids,
        }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.task_timeline.0
    }
}

/// DTO for creating a project.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProject {
    pub name: String,
    pub address: Option<String>,
    /// Defaults to `pending` if omitted.
    pub status: Option<ProjectStatus>,
    pub budget: i64,
    pub start_date: Option<Date>,
    pub completion_date: Option<Date>,
    pub manager_id: Option<DbId>,
    #[serde(default)]
    pub client_ids: Vec<DbId>,
    #[serde(default)]
    pub success_manager_ids: Vec<DbId>,
}
