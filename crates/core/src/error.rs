use crate::types::DbId;

/// Domain error taxonomy shared by every crate in the workspace.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// A cost-containment rule was violated. `available` is the headroom
    /// left in the stage before the attempted change.
    #[error(
        "Budget exceeded: stage budget is {stage_budget}, attempted total is \
         {attempted_total}, remaining budget is {available}"
    )]
    BudgetExceeded {
        stage_budget: i64,
        attempted_total: i64,
        available: i64,
    },

    #[error("Amount mismatch: invoice amount is {expected}, verified payment is {verified}")]
    AmountMismatch { expected: i64, verified: f64 },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_exceeded_message_carries_headroom() {
        let err = CoreError::BudgetExceeded {
            stage_budget: 100_000,
            attempted_total: 110_000,
            available: 40_000,
        };
        let msg = err.to_string();
        assert!(msg.contains("100000"));
        assert!(msg.contains("110000"));
        assert!(msg.contains("remaining budget is 40000"));
    }

    #[test]
    fn not_found_names_entity() {
        let err = CoreError::NotFound {
            entity: "Invoice",
            id: 9,
        };
        assert_eq!(err.to_string(), "Entity not found: Invoice with id 9");
    }
}
