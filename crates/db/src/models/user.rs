//! User entity model and DTOs.

use buildtrack_core::notification::Recipient;
use buildtrack_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub name: String,
    pub email: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    pub fn recipient(&self) -> Recipient {
        Recipient {
            user_id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// DTO for creating a user.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub role: String,
}
