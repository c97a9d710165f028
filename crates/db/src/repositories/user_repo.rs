//! Repository for the `users` table.

use async_trait::async_trait;
use sqlx::PgPool;
use verimail_core::types::{DbId, Timestamp};

use crate::models::user::{CreateUser, User};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, email, name, email_verified, email_verified_at, created_at, updated_at";

/// The slice of the user directory the verification flow depends on.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Insert a new user, returning the created row.
    async fn create(&self, input: &CreateUser) -> Result<User, sqlx::Error>;

    async fn find_by_id(&self, id: DbId) -> Result<Option<User>, sqlx::Error>;

    /// Find a user by email, ignoring case.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error>;

    /// Set `email_verified`. The first verification time is kept if the flag
    /// was already set. Returns `None` if no row with `id` exists.
    async fn mark_email_verified(
        &self,
        id: DbId,
        verified_at: Timestamp,
    ) -> Result<Option<User>, sqlx::Error>;
}

/// PostgreSQL-backed [`UserDirectory`].
#[derive(Debug, Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn create(&self, input: &CreateUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (email, name, email_verified)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.email)
            .bind(&input.name)
            .bind(input.email_verified)
            .fetch_one(&self.pool)
            .await
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)");
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
    }

    async fn mark_email_verified(
        &self,
        id: DbId,
        verified_at: Timestamp,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET
                email_verified = true,
                email_verified_at = COALESCE(email_verified_at, $2),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(verified_at)
            .fetch_optional(&self.pool)
            .await
    }
}
