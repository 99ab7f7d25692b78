//! Shared query parameter types for API handlers.

use buildtrack_core::types::DbId;
use serde::Deserialize;

/// Generic pagination parameters (`?limit=&offset=`).
#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Query parameters accepted by every timeline mutation.
///
/// `expected_version` lets a client fail fast when its copy of the timeline
/// is stale. `confirm` must be `true` for deletions.
#[derive(Debug, Default, Deserialize)]
pub struct TimelineMutationParams {
    pub expected_version: Option<i64>,
    #[serde(default)]
    pub confirm: bool,
}

/// `?projectId=` filter for invoice listing.
#[derive(Debug, Deserialize)]
pub struct ProjectFilter {
    #[serde(rename = "projectId", alias = "project_id")]
    pub project_id: DbId,
}
