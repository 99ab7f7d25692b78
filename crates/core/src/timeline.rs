//! Project timeline model and the mutation rules that guard it.
//!
//! A timeline is an ordered list of [`Stage`]s, each holding an ordered list
//! of [`Task`]s. The functions in this module are pure: they validate a
//! draft, check budget containment, and apply the change to an in-memory
//! timeline. Persisting the result (and detecting concurrent writers) is the
//! caller's job.

use serde::{Deserialize, Serialize};

use crate::cost::{self, CostInput};
use crate::error::CoreError;
use crate::types::{Date, DbId};

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Progress status shared by stages and tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkStatus {
    #[default]
    Pending,
    Ongoing,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
}

impl WorkStatus {
    pub fn is_completed(self) -> bool {
        self == Self::Completed
    }
}

/// A billable unit of work within a stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub start_date: Date,
    pub end_date: Date,
    #[serde(deserialize_with = "cost::deserialize_lenient", default)]
    pub cost: i64,
    #[serde(default)]
    pub status: WorkStatus,
}

/// A named phase of a project with its own budget.
///
/// Invariant (checked on every mutation): `cost >= sum(task.cost)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub id: String,
    pub name: String,
    pub start_date: Date,
    pub end_date: Date,
    #[serde(deserialize_with = "cost::deserialize_lenient", default)]
    pub cost: i64,
    #[serde(default)]
    pub status: WorkStatus,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Stage {
    /// Sum of all task costs in this stage.
    pub fn tasks_total(&self) -> i64 {
        sum_costs(self.tasks.iter().map(|t| t.cost))
    }
}

pub(crate) fn sum_costs(costs: impl Iterator<Item = i64>) -> i64 {
    costs.fold(0i64, |acc, c| acc.saturating_add(c))
}

/// Generate an identifier for a new stage or task.
///
/// UUID v7 keeps identifiers ordered by creation time.
pub fn new_item_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

// ---------------------------------------------------------------------------
// Drafts
// ---------------------------------------------------------------------------

/// Client-supplied fields for creating or editing a stage or task.
///
/// Every field is optional at the wire level so that missing required
/// fields can be reported together as a validation error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemDraft {
    pub name: Option<String>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub cost: Option<CostInput>,
    pub status: Option<WorkStatus>,
}

/// A draft whose required fields are present and well formed.
struct ValidItem {
    name: String,
    start_date: Date,
    end_date: Date,
    cost: i64,
    status: Option<WorkStatus>,
}

impl ItemDraft {
    fn validate(&self, kind: &str) -> Result<ValidItem, CoreError> {
        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());

        let mut missing = Vec::new();
        if name.is_none() {
            missing.push("name");
        }
        if self.start_date.is_none() {
            missing.push("start_date");
        }
        if self.end_date.is_none() {
            missing.push("end_date");
        }
        if self.cost.is_none() {
            missing.push("cost");
        }

        let (Some(name), Some(start_date), Some(end_date)) =
            (name, self.start_date, self.end_date)
        else {
            return Err(missing_fields(kind, &missing));
        };
        if !missing.is_empty() {
            return Err(missing_fields(kind, &missing));
        }

        if end_date < start_date {
            return Err(CoreError::Validation(format!(
                "{kind} end_date {end_date} is before start_date {start_date}"
            )));
        }

        let cost = cost::parse_required_cost(&format!("{kind} cost"), self.cost.as_ref())?;

        Ok(ValidItem {
            name: name.to_string(),
            start_date,
            end_date,
            cost,
            status: self.status,
        })
    }
}

fn missing_fields(kind: &str, missing: &[&str]) -> CoreError {
    CoreError::Validation(format!(
        "{kind} is missing required fields: {}",
        missing.join(", ")
    ))
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

/// Result of an edit, used to fire completion notifications.
///
/// `newly_completed` is edge-triggered: it is `true` only when the item moved
/// from a non-completed status to `Completed` in this edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditOutcome {
    pub newly_completed: bool,
}

impl EditOutcome {
    fn between(old: WorkStatus, new: WorkStatus) -> Self {
        Self {
            newly_completed: !old.is_completed() && new.is_completed(),
        }
    }
}

fn stage_not_found(index: usize) -> CoreError {
    CoreError::NotFound {
        entity: "Stage",
        id: index as DbId,
    }
}

fn task_not_found(index: usize) -> CoreError {
    CoreError::NotFound {
        entity: "Task",
        id: index as DbId,
    }
}

/// Append a new stage with an empty task list. Returns its index.
pub fn add_stage(
    stages: &mut Vec<Stage>,
    draft: &ItemDraft,
    id: String,
) -> Result<usize, CoreError> {
    let valid = draft.validate("Stage")?;
    stages.push(Stage {
        id,
        name: valid.name,
        start_date: valid.start_date,
        end_date: valid.end_date,
        cost: valid.cost,
        status: valid.status.unwrap_or_default(),
        tasks: Vec::new(),
    });
    Ok(stages.len() - 1)
}

/// Replace a stage's fields, keeping its identifier and tasks.
///
/// Rejects a cost lower than the sum of the stage's existing task costs.
/// A missing `status` keeps the current one.
pub fn edit_stage(
    stages: &mut [Stage],
    index: usize,
    draft: &ItemDraft,
) -> Result<EditOutcome, CoreError> {
    let stage = stages.get_mut(index).ok_or_else(|| stage_not_found(index))?;
    let valid = draft.validate("Stage")?;

    let tasks_total = stage.tasks_total();
    if valid.cost < tasks_total {
        return Err(CoreError::BudgetExceeded {
            stage_budget: valid.cost,
            attempted_total: tasks_total,
            available: 0,
        });
    }

    let new_status = valid.status.unwrap_or(stage.status);
    let outcome = EditOutcome::between(stage.status, new_status);

    stage.name = valid.name;
    stage.start_date = valid.start_date;
    stage.end_date = valid.end_date;
    stage.cost = valid.cost;
    stage.status = new_status;

    Ok(outcome)
}

/// Remove a stage and all of its tasks.
///
/// Nothing outside the timeline (such as invoices) is touched.
pub fn delete_stage(stages: &mut Vec<Stage>, index: usize) -> Result<Stage, CoreError> {
    if index >= stages.len() {
        return Err(stage_not_found(index));
    }
    Ok(stages.remove(index))
}

/// Append a task to a stage. Returns the task's index within the stage.
///
/// Exact equality between the resulting task total and the stage cost is
/// allowed.
pub fn add_task(
    stages: &mut [Stage],
    stage_index: usize,
    draft: &ItemDraft,
    id: String,
) -> Result<usize, CoreError> {
    let stage = stages
        .get_mut(stage_index)
        .ok_or_else(|| stage_not_found(stage_index))?;
    let valid = draft.validate("Task")?;

    let existing = stage.tasks_total();
    check_containment(stage.cost, existing, valid.cost)?;

    stage.tasks.push(Task {
        id,
        name: valid.name,
        start_date: valid.start_date,
        end_date: valid.end_date,
        cost: valid.cost,
        status: valid.status.unwrap_or_default(),
    });
    Ok(stage.tasks.len() - 1)
}

/// Replace a task's fields, keeping its identifier.
///
/// The containment check counts every other task in the stage plus the
/// edited task's new cost.
pub fn edit_task(
    stages: &mut [Stage],
    stage_index: usize,
    task_index: usize,
    draft: &ItemDraft,
) -> Result<EditOutcome, CoreError> {
    let stage = stages
        .get_mut(stage_index)
        .ok_or_else(|| stage_not_found(stage_index))?;
    if task_index >= stage.tasks.len() {
        return Err(task_not_found(task_index));
    }
    let valid = draft.validate("Task")?;

    let others = sum_costs(
        stage
            .tasks
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != task_index)
            .map(|(_, t)| t.cost),
    );
    check_containment(stage.cost, others, valid.cost)?;

    let task = &mut stage.tasks[task_index];
    let new_status = valid.status.unwrap_or(task.status);
    let outcome = EditOutcome::between(task.status, new_status);

    task.name = valid.name;
    task.start_date = valid.start_date;
    task.end_date = valid.end_date;
    task.cost = valid.cost;
    task.status = new_status;

    Ok(outcome)
}

/// Remove a single task from a stage.
pub fn delete_task(
    stages: &mut [Stage],
    stage_index: usize,
    task_index: usize,
) -> Result<Task, CoreError> {
    let stage = stages
        .get_mut(stage_index)
        .ok_or_else(|| stage_not_found(stage_index))?;
    if task_index >= stage.tasks.len() {
        return Err(task_not_found(task_index));
    }
    Ok(stage.tasks.remove(task_index))
}

fn check_containment(stage_budget: i64, committed: i64, candidate: i64) -> Result<(), CoreError> {
    let attempted_total = committed.saturating_add(candidate);
    if attempted_total > stage_budget {
        return Err(CoreError::BudgetExceeded {
            stage_budget,
            attempted_total,
            available: (stage_budget - committed).max(0),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn date(s: &str) -> Date {
        s.parse().unwrap()
    }

    fn draft_with(name: &str, cost: CostInput) -> ItemDraft {
        ItemDraft {
            name: Some(name.to_string()),
            start_date: Some(date("2026-01-05")),
            end_date: Some(date("2026-02-05")),
            cost: Some(cost),
            status: None,
        }
    }

    fn draft(name: &str, cost: i64) -> ItemDraft {
        draft_with(name, CostInput::Amount(cost))
    }

    fn with_status(mut d: ItemDraft, status: WorkStatus) -> ItemDraft {
        d.status = Some(status);
        d
    }

    /// One stage costing 100000 with a single task costing 60000.
    fn foundation() -> Vec<Stage> {
        let mut stages = Vec::new();
        add_stage(&mut stages, &draft("Foundation", 100_000), "s1".into()).unwrap();
        add_task(&mut stages, 0, &draft("Excavation", 60_000), "t1".into()).unwrap();
        stages
    }

    // -- add_stage --

    #[test]
    fn add_stage_appends_with_empty_tasks() {
        let mut stages = Vec::new();
        let roofing = draft_with("Roofing", "₦250,000".into());
        let idx = add_stage(&mut stages, &roofing, new_item_id()).unwrap();
        assert_eq!(idx, 0);
        assert_eq!(stages[0].cost, 250_000);
        assert_eq!(stages[0].status, WorkStatus::Pending);
        assert!(stages[0].tasks.is_empty());
    }

    #[test]
    fn add_stage_reports_all_missing_fields() {
        let mut stages = Vec::new();
        let result = add_stage(&mut stages, &ItemDraft::default(), "s".into());
        assert_matches!(
            result,
            Err(CoreError::Validation(msg)) if msg.contains("name, start_date, end_date, cost")
        );
        assert!(stages.is_empty());
    }

    #[test]
    fn add_stage_rejects_blank_name() {
        let mut stages = Vec::new();
        let result = add_stage(&mut stages, &draft("   ", 10), "s".into());
        assert_matches!(result, Err(CoreError::Validation(msg)) if msg.contains("name"));
    }

    #[test]
    fn add_stage_rejects_inverted_dates() {
        let mut stages = Vec::new();
        let mut d = draft("Framing", 10);
        d.end_date = Some(date("2025-12-31"));
        assert_matches!(
            add_stage(&mut stages, &d, "s".into()),
            Err(CoreError::Validation(msg)) if msg.contains("before start_date")
        );
    }

    // -- edit_stage --

    #[test]
    fn edit_stage_rejects_cost_below_tasks_total() {
        let mut stages = foundation();
        let result = edit_stage(&mut stages, 0, &draft("Foundation", 59_999));
        assert_matches!(
            result,
            Err(CoreError::BudgetExceeded { stage_budget: 59_999, attempted_total: 60_000, .. })
        );
        assert_eq!(stages[0].cost, 100_000, "failed edit must not change state");
    }

    #[test]
    fn edit_stage_accepts_cost_equal_to_tasks_total() {
        let mut stages = foundation();
        edit_stage(&mut stages, 0, &draft("Foundation (revised)", 60_000)).unwrap();
        assert_eq!(stages[0].cost, 60_000);
        assert_eq!(stages[0].name, "Foundation (revised)");
        assert_eq!(stages[0].id, "s1");
        assert_eq!(stages[0].tasks.len(), 1, "tasks survive an edit");
    }

    #[test]
    fn edit_stage_completion_is_edge_triggered() {
        let mut stages = foundation();
        let done = with_status(draft("Foundation", 100_000), WorkStatus::Completed);

        let first = edit_stage(&mut stages, 0, &done).unwrap();
        assert!(first.newly_completed);

        let second = edit_stage(&mut stages, 0, &done).unwrap();
        assert!(!second.newly_completed, "already completed stage must not re-fire");
    }

    #[test]
    fn edit_stage_without_status_keeps_current() {
        let mut stages = foundation();
        edit_stage(
            &mut stages,
            0,
            &with_status(draft("Foundation", 100_000), WorkStatus::InProgress),
        )
        .unwrap();
        edit_stage(&mut stages, 0, &draft("Foundation", 100_000)).unwrap();
        assert_eq!(stages[0].status, WorkStatus::InProgress);
    }

    #[test]
    fn edit_stage_out_of_range_is_not_found() {
        let mut stages = foundation();
        assert_matches!(
            edit_stage(&mut stages, 3, &draft("x", 1)),
            Err(CoreError::NotFound { entity: "Stage", id: 3 })
        );
    }

    // -- delete_stage --

    #[test]
    fn delete_stage_removes_stage_and_tasks() {
        let mut stages = foundation();
        let removed = delete_stage(&mut stages, 0).unwrap();
        assert_eq!(removed.tasks.len(), 1);
        assert!(stages.is_empty());
        assert_matches!(delete_stage(&mut stages, 0), Err(CoreError::NotFound { .. }));
    }

    // -- add_task --

    #[test]
    fn add_task_over_budget_fails_with_headroom() {
        let mut stages = foundation();
        let result = add_task(&mut stages, 0, &draft("Blinding", 50_000), "t2".into());
        assert_matches!(
            result,
            Err(CoreError::BudgetExceeded {
                stage_budget: 100_000,
                attempted_total: 110_000,
                available: 40_000,
            })
        );
        assert_eq!(stages[0].tasks.len(), 1);
    }

    #[test]
    fn add_task_at_exact_budget_succeeds() {
        let mut stages = foundation();
        let idx = add_task(&mut stages, 0, &draft("Blinding", 40_000), "t2".into()).unwrap();
        assert_eq!(idx, 1);
        assert_eq!(stages[0].tasks_total(), 100_000);
    }

    #[test]
    fn add_task_to_missing_stage_is_not_found() {
        let mut stages = foundation();
        assert_matches!(
            add_task(&mut stages, 1, &draft("x", 1), "t".into()),
            Err(CoreError::NotFound { entity: "Stage", .. })
        );
    }

    // -- edit_task --

    #[test]
    fn edit_task_excludes_its_own_previous_cost() {
        let mut stages = foundation();
        // 60000 -> 100000 is fine because the old 60000 no longer counts.
        edit_task(&mut stages, 0, 0, &draft("Excavation", 100_000)).unwrap();
        assert_eq!(stages[0].tasks[0].cost, 100_000);
        assert_eq!(stages[0].tasks[0].id, "t1");
    }

    #[test]
    fn edit_task_over_budget_fails() {
        let mut stages = foundation();
        add_task(&mut stages, 0, &draft("Blinding", 30_000), "t2".into()).unwrap();
        let result = edit_task(&mut stages, 0, 1, &draft("Blinding", 40_001));
        assert_matches!(
            result,
            Err(CoreError::BudgetExceeded { attempted_total: 100_001, available: 40_000, .. })
        );
        assert_eq!(stages[0].tasks[1].cost, 30_000);
    }

    #[test]
    fn edit_task_completion_fires_once() {
        let mut stages = foundation();
        let done = with_status(draft("Excavation", 60_000), WorkStatus::Completed);
        assert!(edit_task(&mut stages, 0, 0, &done).unwrap().newly_completed);
        assert!(!edit_task(&mut stages, 0, 0, &done).unwrap().newly_completed);
    }

    #[test]
    fn edit_task_out_of_range_is_not_found() {
        let mut stages = foundation();
        assert_matches!(
            edit_task(&mut stages, 0, 5, &draft("x", 1)),
            Err(CoreError::NotFound { entity: "Task", id: 5 })
        );
    }

    // -- delete_task --

    #[test]
    fn delete_task_removes_only_that_task() {
        let mut stages = foundation();
        add_task(&mut stages, 0, &draft("Blinding", 10_000), "t2".into()).unwrap();
        let removed = delete_task(&mut stages, 0, 0).unwrap();
        assert_eq!(removed.id, "t1");
        assert_eq!(stages[0].tasks.len(), 1);
        assert_eq!(stages[0].tasks[0].id, "t2");
    }

    // -- serde --

    #[test]
    fn status_uses_display_names_on_the_wire() {
        let json = serde_json::to_string(&WorkStatus::InProgress).unwrap();
        assert_eq!(json, "\"In Progress\"");
        let parsed: WorkStatus = serde_json::from_str("\"Ongoing\"").unwrap();
        assert_eq!(parsed, WorkStatus::Ongoing);
    }

    #[test]
    fn stored_stage_with_string_costs_loads() {
        let json = r#"{
            "id": "legacy",
            "name": "Plumbing",
            "start_date": "2025-03-01",
            "end_date": "2025-04-01",
            "cost": "₦500,000",
            "status": "Completed",
            "tasks": [{
                "id": "lt",
                "name": "Pipes",
                "start_date": "2025-03-01",
                "end_date": "2025-03-10",
                "cost": "₦120,000"
            }]
        }"#;
        let stage: Stage = serde_json::from_str(json).unwrap();
        assert_eq!(stage.cost, 500_000);
        assert_eq!(stage.tasks[0].cost, 120_000);
        assert_eq!(stage.tasks[0].status, WorkStatus::Pending);
    }
}
