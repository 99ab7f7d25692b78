//! Project status values and membership-based access rules.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::roles::{ROLE_ADMIN, ROLE_PROJECT_MANAGER};
use crate::types::DbId;

/// Lifecycle status of a construction project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProjectStatus {
    Pending,
    InProgress,
    OnHold,
    Completed,
    Cancelled,
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 5] = [
        Self::Pending,
        Self::InProgress,
        Self::OnHold,
        Self::Completed,
        Self::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "inProgress",
            Self::OnHold => "onHold",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|s| s.as_str() == value)
            .ok_or_else(|| CoreError::Validation(format!("Invalid project status '{value}'")))
    }
}

impl TryFrom<String> for ProjectStatus {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

/// The people attached to a project.
#[derive(Debug, Clone, Copy)]
pub struct ProjectMembers<'a> {
    pub manager_id: Option<DbId>,
    pub client_ids: &'a [DbId],
    pub success_manager_ids: &'a [DbId],
}

impl ProjectMembers<'_> {
    pub fn is_member(&self, user_id: DbId) -> bool {
        self.manager_id == Some(user_id)
            || self.client_ids.contains(&user_id)
            || self.success_manager_ids.contains(&user_id)
    }
}

/// Level of access an operation needs on a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectAccess {
    /// Read the project, its timeline, and its invoices.
    View,
    /// Mutate the timeline and issue or change invoices.
    Manage,
}

/// Check whether a principal may access a project.
///
/// Admins may do anything. Managing requires being the project's assigned
/// project manager; viewing requires any membership.
pub fn authorize(
    user_id: DbId,
    role: &str,
    members: &ProjectMembers<'_>,
    access: ProjectAccess,
) -> Result<(), CoreError> {
    if role == ROLE_ADMIN {
        return Ok(());
    }
    let allowed = match access {
        ProjectAccess::View => members.is_member(user_id),
        ProjectAccess::Manage => {
            role == ROLE_PROJECT_MANAGER && members.manager_id == Some(user_id)
        }
    };
    if allowed {
        Ok(())
    } else {
        Err(CoreError::Forbidden(match access {
            ProjectAccess::View => "Not a member of this project".into(),
            ProjectAccess::Manage => "Only the project's manager can change it".into(),
        }))
    }
}
