//! Well-known role name constants.
//!
//! These must match the `users.role` check constraint in the initial
//! migration.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_PROJECT_MANAGER: &str = "project_manager";
pub const ROLE_CLIENT: &str = "client";
pub const ROLE_SUCCESS_MANAGER: &str = "success_manager";

/// All valid role values.
pub const VALID_ROLES: &[&str] = &[
    ROLE_ADMIN,
    ROLE_PROJECT_MANAGER,
    ROLE_CLIENT,
    ROLE_SUCCESS_MANAGER,
];

/// Validate that a role string is one of the accepted values.
pub fn validate_role(role: &str) -> Result<(), String> {
    if VALID_ROLES.contains(&role) {
        Ok(())
    } else {
        Err(format!(
            "Invalid role '{role}'. Must be one of: {}",
            VALID_ROLES.join(", ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_roles_are_valid() {
        for role in VALID_ROLES {
            assert!(validate_role(role).is_ok());
        }
    }

    #[test]
    fn unknown_role_is_rejected() {
        let err = validate_role("superuser").unwrap_err();
        assert!(err.contains("Invalid role"));
    }
}
