//! Budget roll-up over a project timeline.

use serde::Serialize;

use crate::timeline::{sum_costs, Stage};

/// Usage fraction above which a budget is "Warning".
pub const WARNING_THRESHOLD: f64 = 0.75;
/// Usage fraction above which a budget is "Critical".
pub const CRITICAL_THRESHOLD: f64 = 0.9;

/// Health classification of a budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BudgetHealth {
    Healthy,
    Warning,
    Critical,
}

impl BudgetHealth {
    /// Classify a usage fraction. Both thresholds are strict: exactly 0.9 is
    /// still "Warning" and exactly 0.75 is still "Healthy".
    pub fn from_usage(percentage_used: f64) -> Self {
        if percentage_used > CRITICAL_THRESHOLD {
            Self::Critical
        } else if percentage_used > WARNING_THRESHOLD {
            Self::Warning
        } else {
            Self::Healthy
        }
    }
}

/// Derived budget figures for a timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetSummary {
    pub total: i64,
    pub spent: i64,
    pub remaining: i64,
    /// `spent / total` as a fraction, `0.0` when `total` is zero.
    pub percentage_used: f64,
    pub status: BudgetHealth,
}

/// Compute total, spent and remaining budget for a timeline.
///
/// `spent` counts the cost of every completed stage plus the cost of every
/// completed task, whether or not the task's stage is itself completed.
pub fn compute_budget(stages: &[Stage]) -> BudgetSummary {
    let total = sum_costs(stages.iter().map(|s| s.cost));

    let completed_stages = sum_costs(
        stages
            .iter()
            .filter(|s| s.status.is_completed())
            .map(|s| s.cost),
    );
    let completed_tasks = sum_costs(
        stages
            .iter()
            .flat_map(|s| s.tasks.iter())
            .filter(|t| t.status.is_completed())
            .map(|t| t.cost),
    );
    let spent = completed_stages.saturating_add(completed_tasks);

    let percentage_used = if total == 0 {
        0.0
    } else {
        spent as f64 / total as f64
    };

    BudgetSummary {
        total,
        spent,
        remaining: total - spent,
        percentage_used,
        status: BudgetHealth::from_usage(percentage_used),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::{Task, WorkStatus};

    fn task(cost: i64, status: WorkStatus) -> Task {
        Task {
            id: format!("t-{cost}"),
            name: "task".into(),
            start_date: "2026-01-01".parse().unwrap(),
            end_date: "2026-01-02".parse().unwrap(),
            cost,
            status,
        }
    }

    fn stage(cost: i64, status: WorkStatus, tasks: Vec<Task>) -> Stage {
        Stage {
            id: format!("s-{cost}"),
            name: "stage".into(),
            start_date: "2026-01-01".parse().unwrap(),
            end_date: "2026-02-01".parse().unwrap(),
            cost,
            status,
            tasks,
        }
    }

    /// A timeline totalling 10000 where `spent` completed-task cost is spent.
    fn usage(spent: i64) -> BudgetSummary {
        compute_budget(&[stage(
            10_000,
            WorkStatus::Ongoing,
            vec![task(spent, WorkStatus::Completed)],
        )])
    }

    #[test]
    fn empty_timeline_is_healthy_zero() {
        let summary = compute_budget(&[]);
        assert_eq!(
            summary,
            BudgetSummary {
                total: 0,
                spent: 0,
                remaining: 0,
                percentage_used: 0.0,
                status: BudgetHealth::Healthy,
            }
        );
    }

    #[test]
    fn completed_tasks_in_open_stage_count_as_spent() {
        let summary = compute_budget(&[
            stage(
                100_000,
                WorkStatus::InProgress,
                vec![
                    task(30_000, WorkStatus::Completed),
                    task(20_000, WorkStatus::Pending),
                ],
            ),
            stage(50_000, WorkStatus::Completed, vec![]),
        ]);
        assert_eq!(summary.total, 150_000);
        assert_eq!(summary.spent, 80_000);
        assert_eq!(summary.remaining, 70_000);
    }

    #[test]
    fn completed_stage_and_its_completed_tasks_both_count() {
        let summary = compute_budget(&[stage(
            10_000,
            WorkStatus::Completed,
            vec![task(4_000, WorkStatus::Completed)],
        )]);
        assert_eq!(summary.spent, 14_000);
        assert_eq!(summary.remaining, -4_000);
        assert_eq!(summary.status, BudgetHealth::Critical);
    }

    #[test]
    fn exactly_ninety_percent_is_warning() {
        let summary = usage(9_000);
        assert_eq!(summary.percentage_used, 0.9);
        assert_eq!(summary.status, BudgetHealth::Warning);
    }

    #[test]
    fn just_above_ninety_percent_is_critical() {
        assert_eq!(usage(9_001).status, BudgetHealth::Critical);
    }

    #[test]
    fn exactly_seventy_five_percent_is_healthy() {
        let summary = usage(7_500);
        assert_eq!(summary.percentage_used, 0.75);
        assert_eq!(summary.status, BudgetHealth::Healthy);
    }

    #[test]
    fn just_above_seventy_five_percent_is_warning() {
        assert_eq!(usage(7_501).status, BudgetHealth::Warning);
    }

    #[test]
    fn classification_thresholds_are_strict() {
        assert_eq!(BudgetHealth::from_usage(0.9), BudgetHealth::Warning);
        assert_eq!(BudgetHealth::from_usage(0.9001), BudgetHealth::Critical);
        assert_eq!(BudgetHealth::from_usage(0.75), BudgetHealth::Healthy);
        assert_eq!(BudgetHealth::from_usage(0.7501), BudgetHealth::Warning);
    }
}
