//! Repository for the `users` table.

use buildtrack_core::types::DbId;
use sqlx::PgPool;

use crate::models::user::{CreateUser, User};

const COLUMNS: &str = "id, name, email, role, is_active, created_at, updated_at";

/// Provides lookups used to resolve project members into recipients.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (name, email, role) VALUES ($1, $2, $3) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.name)
            .bind(&input.email)
            .bind(&input.role)
            .fetch_one(pool)
            .await
    }

    /// Find a user by ID, including inactive users.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Active users among `ids`, ordered by ID. Unknown IDs are skipped.
    pub async fn find_active_by_ids(pool: &PgPool, ids: &[DbId]) -> Result<Vec<User>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT {COLUMNS} FROM users WHERE id = ANY($1) AND is_active ORDER BY id"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await
    }
}
