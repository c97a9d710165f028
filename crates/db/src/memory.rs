//! In-process implementations of the storage seams.
//!
//! They mirror the PostgreSQL semantics the flow relies on (unique token
//! digests, delete-then-insert replacement, case-insensitive email lookup)
//! and can be switched into a failing mode to exercise storage-error paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use verimail_core::types::{DbId, Timestamp, TokenId};

use crate::models::user::{CreateUser, User};
use crate::models::verification_token::{CreateVerificationToken, VerificationToken};
use crate::repositories::{TokenRepository, UserDirectory};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn unavailable() -> sqlx::Error {
    sqlx::Error::PoolTimedOut
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

/// [`TokenRepository`] backed by a map.
#[derive(Debug, Default)]
pub struct MemoryTokenRepository {
    rows: Mutex<HashMap<TokenId, VerificationToken>>,
    failing: AtomicBool,
}

impl MemoryTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, every operation returns a storage error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Snapshot of all rows, oldest first.
    pub fn rows(&self) -> Vec<VerificationToken> {
        let mut rows: Vec<_> = lock(&self.rows).values().cloned().collect();
        rows.sort_by_key(|t| t.created_at);
        rows
    }

    fn check(&self) -> Result<(), sqlx::Error> {
        if self.failing.load(Ordering::SeqCst) {
            Err(unavailable())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TokenRepository for MemoryTokenRepository {
    async fn replace_for_user(
        &self,
        input: &CreateVerificationToken,
    ) -> Result<VerificationToken, sqlx::Error> {
        self.check()?;
        let mut rows = lock(&self.rows);

        let clash = rows
            .values()
            .any(|t| t.token_hash == input.token_hash && t.user_id != input.user_id);
        if clash || rows.contains_key(&input.id) {
            return Err(sqlx::Error::Protocol(
                "duplicate key value violates unique constraint".into(),
            ));
        }

        rows.retain(|_, t| t.user_id != input.user_id);
        let token = VerificationToken {
            id: input.id,
            user_id: input.user_id,
            token_hash: input.token_hash.clone(),
            email: input.email.clone(),
            expires_at: input.expires_at,
            used: false,
            used_at: None,
            created_at: input.created_at,
        };
        rows.insert(token.id, token.clone());
        Ok(token)
    }

    async fn find_by_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<VerificationToken>, sqlx::Error> {
        self.check()?;
        Ok(lock(&self.rows)
            .values()
            .find(|t| t.token_hash == token_hash)
            .cloned())
    }

    async fn mark_used(&self, token_hash: &str, used_at: Timestamp) -> Result<bool, sqlx::Error> {
        self.check()?;
        let mut rows = lock(&self.rows);
        match rows
            .values_mut()
            .find(|t| t.token_hash == token_hash && !t.used)
        {
            Some(token) => {
                token.used = true;
                token.used_at = Some(used_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: TokenId) -> Result<bool, sqlx::Error> {
        self.check()?;
        Ok(lock(&self.rows).remove(&id).is_some())
    }

    async fn delete_by_user(&self, user_id: DbId) -> Result<u64, sqlx::Error> {
        self.check()?;
        let mut rows = lock(&self.rows);
        let before = rows.len();
        rows.retain(|_, t| t.user_id != user_id);
        Ok((before - rows.len()) as u64)
    }

    async fn delete_expired(&self, now: Timestamp) -> Result<u64, sqlx::Error> {
        self.check()?;
        let mut rows = lock(&self.rows);
        let before = rows.len();
        rows.retain(|_, t| t.expires_at >= now);
        Ok((before - rows.len()) as u64)
    }

    async fn latest_unused_for_user(
        &self,
        user_id: DbId,
        now: Timestamp,
    ) -> Result<Option<VerificationToken>, sqlx::Error> {
        self.check()?;
        Ok(lock(&self.rows)
            .values()
            .filter(|t| t.user_id == user_id && !t.used && t.expires_at > now)
            .max_by_key(|t| t.created_at)
            .cloned())
    }

    async fn health_check(&self) -> Result<(), sqlx::Error> {
        self.check()
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// [`UserDirectory`] backed by a map.
#[derive(Debug)]
pub struct MemoryUserDirectory {
    users: Mutex<HashMap<DbId, User>>,
    next_id: AtomicI64,
    failing: AtomicBool,
}

impl Default for MemoryUserDirectory {
    fn default() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1),
            failing: AtomicBool::new(false),
        }
    }
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, every operation returns a storage error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Remove a user. Tokens are not touched; callers pair this with
    /// [`TokenStore::delete_by_user`](crate::TokenStore::delete_by_user) the
    /// way the foreign-key cascade does in PostgreSQL.
    pub fn remove(&self, id: DbId) -> Option<User> {
        lock(&self.users).remove(&id)
    }

    fn check(&self) -> Result<(), sqlx::Error> {
        if self.failing.load(Ordering::SeqCst) {
            Err(unavailable())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn create(&self, input: &CreateUser) -> Result<User, sqlx::Error> {
        self.check()?;
        let mut users = lock(&self.users);
        let taken = users
            .values()
            .any(|u| u.email.to_lowercase() == input.email.to_lowercase());
        if taken {
            return Err(sqlx::Error::Protocol(
                "duplicate key value violates unique constraint \"uq_users_email_lower\"".into(),
            ));
        }

        let now = Utc::now();
        let user = User {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            email: input.email.clone(),
            name: input.name.clone(),
            email_verified: input.email_verified,
            email_verified_at: input.email_verified.then_some(now),
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<User>, sqlx::Error> {
        self.check()?;
        Ok(lock(&self.users).get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        self.check()?;
        let wanted = email.to_lowercase();
        Ok(lock(&self.users)
            .values()
            .find(|u| u.email.to_lowercase() == wanted)
            .cloned())
    }

    async fn mark_email_verified(
        &self,
        id: DbId,
        verified_at: Timestamp,
    ) -> Result<Option<User>, sqlx::Error> {
        self.check()?;
        let mut users = lock(&self.users);
        Ok(users.get_mut(&id).map(|user| {
            user.email_verified = true;
            user.email_verified_at.get_or_insert(verified_at);
            user.updated_at = Utc::now();
            user.clone()
        }))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;
    use uuid::Uuid;

    use super::*;

    fn token_input(user_id: DbId, hash: &str, created_at: Timestamp) -> CreateVerificationToken {
        CreateVerificationToken {
            id: Uuid::new_v4(),
            user_id,
            token_hash: hash.to_string(),
            email: "a@b.com".to_string(),
            expires_at: created_at + TimeDelta::hours(1),
            created_at,
        }
    }

    #[tokio::test]
    async fn replacing_removes_prior_rows_for_the_same_user_only() {
        let repo = MemoryTokenRepository::new();
        let now = Utc::now();
        repo.replace_for_user(&token_input(1, "h1", now)).await.unwrap();
        repo.replace_for_user(&token_input(2, "h2", now)).await.unwrap();
        repo.replace_for_user(&token_input(1, "h3", now)).await.unwrap();

        let hashes: Vec<_> = repo.rows().into_iter().map(|t| t.token_hash).collect();
        assert_eq!(hashes.len(), 2);
        assert!(hashes.contains(&"h2".to_string()));
        assert!(hashes.contains(&"h3".to_string()));
    }

    #[tokio::test]
    async fn duplicate_hash_across_users_is_rejected() {
        let repo = MemoryTokenRepository::new();
        let now = Utc::now();
        repo.replace_for_user(&token_input(1, "same", now)).await.unwrap();
        assert!(repo.replace_for_user(&token_input(2, "same", now)).await.is_err());
    }

    #[tokio::test]
    async fn mark_used_only_transitions_once() {
        let repo = MemoryTokenRepository::new();
        let now = Utc::now();
        repo.replace_for_user(&token_input(1, "h", now)).await.unwrap();

        assert!(repo.mark_used("h", now).await.unwrap());
        assert!(!repo.mark_used("h", now).await.unwrap());
        assert!(!repo.mark_used("unknown", now).await.unwrap());
    }

    #[tokio::test]
    async fn failing_mode_surfaces_errors() {
        let repo = MemoryTokenRepository::new();
        repo.set_failing(true);
        assert!(repo.find_by_hash("h").await.is_err());
        assert!(repo.health_check().await.is_err());
    }

    #[tokio::test]
    async fn users_are_found_case_insensitively_and_verification_time_sticks() {
        let users = MemoryUserDirectory::new();
        let user = users
            .create(&CreateUser {
                email: "Alice@Example.com".into(),
                name: "Alice".into(),
                email_verified: false,
            })
            .await
            .unwrap();
        assert!(!user.email_verified);

        let found = users.find_by_email("alice@example.com").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));

        let first = Utc::now();
        let verified = users.mark_email_verified(user.id, first).await.unwrap().unwrap();
        assert!(verified.email_verified);
        assert_eq!(verified.email_verified_at, Some(first));

        let again = users
            .mark_email_verified(user.id, first + TimeDelta::hours(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(again.email_verified_at, Some(first));

        assert!(users.mark_email_verified(999, first).await.unwrap().is_none());
    }
}
