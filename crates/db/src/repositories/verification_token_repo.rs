//! Repository for the `email_verification_tokens` table.

use async_trait::async_trait;
use sqlx::PgPool;
use verimail_core::types::{DbId, Timestamp, TokenId};

use crate::models::verification_token::{CreateVerificationToken, VerificationToken};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, token_hash, email, expires_at, used, used_at, created_at";

/// Raw storage operations for verification tokens.
///
/// Implementations report storage failures as `sqlx::Error`; the
/// [`TokenStore`](crate::TokenStore) decides how those surface to callers.
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Delete every token belonging to `input.user_id`, then insert `input`,
    /// as one unit of work. Returns the inserted row.
    async fn replace_for_user(
        &self,
        input: &CreateVerificationToken,
    ) -> Result<VerificationToken, sqlx::Error>;

    /// Exact match on the stored digest.
    async fn find_by_hash(&self, token_hash: &str)
        -> Result<Option<VerificationToken>, sqlx::Error>;

    /// Flag an unused token as consumed. Returns `true` if a row changed.
    async fn mark_used(&self, token_hash: &str, used_at: Timestamp) -> Result<bool, sqlx::Error>;

    /// Remove a single token. Returns `true` if a row was deleted.
    async fn delete(&self, id: TokenId) -> Result<bool, sqlx::Error>;

    /// Remove all tokens for a user. Returns the number of deleted rows.
    async fn delete_by_user(&self, user_id: DbId) -> Result<u64, sqlx::Error>;

    /// Remove tokens whose `expires_at` is before `now`.
    async fn delete_expired(&self, now: Timestamp) -> Result<u64, sqlx::Error>;

    /// Most recently created token for the user that is unused and still
    /// live at `now`.
    async fn latest_unused_for_user(
        &self,
        user_id: DbId,
        now: Timestamp,
    ) -> Result<Option<VerificationToken>, sqlx::Error>;

    /// Confirm the backing store is reachable.
    async fn health_check(&self) -> Result<(), sqlx::Error>;
}

/// PostgreSQL-backed [`TokenRepository`].
#[derive(Debug, Clone)]
pub struct PgTokenRepository {
    pool: PgPool,
}

impl PgTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenRepository for PgTokenRepository {
    async fn replace_for_user(
        &self,
        input: &CreateVerificationToken,
    ) -> Result<VerificationToken, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM email_verification_tokens WHERE user_id = $1")
            .bind(input.user_id)
            .execute(&mut *tx)
            .await?;

        let query = format!(
            "INSERT INTO email_verification_tokens
                (id, user_id, token_hash, email, expires_at, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        let token = sqlx::query_as::<_, VerificationToken>(&query)
            .bind(input.id)
            .bind(input.user_id)
            .bind(&input.token_hash)
            .bind(&input.email)
            .bind(input.expires_at)
            .bind(input.created_at)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(token)
    }

    async fn find_by_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<VerificationToken>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM email_verification_tokens WHERE token_hash = $1");
        sqlx::query_as::<_, VerificationToken>(&query)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await
    }

    async fn mark_used(&self, token_hash: &str, used_at: Timestamp) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE email_verification_tokens SET used = true, used_at = $2
             WHERE token_hash = $1 AND used = false",
        )
        .bind(token_hash)
        .bind(used_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: TokenId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM email_verification_tokens WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_user(&self, user_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM email_verification_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_expired(&self, now: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM email_verification_tokens WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn latest_unused_for_user(
        &self,
        user_id: DbId,
        now: Timestamp,
    ) -> Result<Option<VerificationToken>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM email_verification_tokens
             WHERE user_id = $1
               AND used = false
               AND expires_at > $2
             ORDER BY created_at DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, VerificationToken>(&query)
            .bind(user_id)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
    }

    async fn health_check(&self) -> Result<(), sqlx::Error> {
        crate::health_check(&self.pool).await
    }
}
