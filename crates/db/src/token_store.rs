//! Verification token issuance, lookup, and consumption.
//!
//! [`TokenStore`] never returns storage errors to its caller. Every failure
//! is logged and collapsed into a sentinel (`None`, `false`, `0`, or
//! [`TokenRejection::NotFound`]) so request handlers have exactly one failure
//! signal per operation.

use std::sync::Arc;

use chrono::TimeDelta;
use uuid::Uuid;
use verimail_core::clock::Clock;
use verimail_core::secret::{generate_secret, hash_secret};
use verimail_core::types::{DbId, TokenId};
use verimail_core::verification::{evaluate, TokenRejection};

use crate::models::verification_token::{CreateVerificationToken, VerificationToken};
use crate::repositories::TokenRepository;

/// A newly issued token together with its plaintext secret.
///
/// This is the only place the plaintext exists; it must go straight into the
/// outgoing email.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: VerificationToken,
    pub secret: String,
}

/// Token lifecycle operations over a [`TokenRepository`].
#[derive(Clone)]
pub struct TokenStore {
    repo: Arc<dyn TokenRepository>,
    clock: Arc<dyn Clock>,
}

impl TokenStore {
    pub fn new(repo: Arc<dyn TokenRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// Issue a fresh token for `user_id`, replacing any tokens it already has.
    ///
    /// Returns `None` if `ttl_seconds` is not positive or storage fails.
    pub async fn create_token(
        &self,
        user_id: DbId,
        email: &str,
        ttl_seconds: i64,
    ) -> Option<IssuedToken> {
        let now = self.clock.now();
        let Some(expires_at) = TimeDelta::try_seconds(ttl_seconds)
            .filter(|ttl| *ttl > TimeDelta::zero())
            .and_then(|ttl| now.checked_add_signed(ttl))
        else {
            tracing::warn!(user_id, ttl_seconds, "Refusing to issue token with invalid TTL");
            return None;
        };

        let secret = generate_secret();
        let input = CreateVerificationToken {
            id: Uuid::new_v4(),
            user_id,
            token_hash: secret.hash,
            email: email.to_string(),
            expires_at,
            created_at: now,
        };

        match self.repo.replace_for_user(&input).await {
            Ok(token) => {
                tracing::debug!(user_id, token_id = %token.id, %expires_at, "Issued verification token");
                Some(IssuedToken {
                    token,
                    secret: secret.plaintext,
                })
            }
            Err(e) => {
                tracing::error!(user_id, error = %e, "Failed to create verification token");
                None
            }
        }
    }

    /// Look a token up by the secret the user presented.
    pub async fn get_by_secret(&self, secret: &str) -> Option<VerificationToken> {
        if secret.is_empty() {
            return None;
        }
        match self.repo.find_by_hash(&hash_secret(secret)).await {
            Ok(token) => token,
            Err(e) => {
                tracing::error!(error = %e, "Failed to look up verification token");
                None
            }
        }
    }

    /// Check a secret without consuming it.
    ///
    /// Returns the owning user id when the token exists, is unused, and has
    /// not expired. Callers consume the token with [`TokenStore::mark_used`]
    /// only after their own follow-up work succeeds.
    pub async fn validate(&self, secret: &str) -> Result<DbId, TokenRejection> {
        let token = self
            .get_by_secret(secret)
            .await
            .ok_or(TokenRejection::NotFound)?;
        evaluate(token.used, token.expires_at, self.clock.now())?;
        Ok(token.user_id)
    }

    /// Consume the token for `secret`. Returns `true` only for the call that
    /// flips it from unused to used.
    pub async fn mark_used(&self, secret: &str) -> bool {
        if secret.is_empty() {
            return false;
        }
        match self
            .repo
            .mark_used(&hash_secret(secret), self.clock.now())
            .await
        {
            Ok(changed) => changed,
            Err(e) => {
                tracing::error!(error = %e, "Failed to mark verification token used");
                false
            }
        }
    }

    /// Remove a single token by id.
    pub async fn delete(&self, token_id: TokenId) -> bool {
        match self.repo.delete(token_id).await {
            Ok(deleted) => deleted,
            Err(e) => {
                tracing::error!(%token_id, error = %e, "Failed to delete verification token");
                false
            }
        }
    }

    /// Purge tokens that are past their expiry. Returns the number removed.
    pub async fn delete_expired(&self) -> u64 {
        match self.repo.delete_expired(self.clock.now()).await {
            Ok(count) => count,
            Err(e) => {
                tracing::error!(error = %e, "Failed to delete expired verification tokens");
                0
            }
        }
    }

    /// Remove every token belonging to a user.
    pub async fn delete_by_user(&self, user_id: DbId) -> bool {
        match self.repo.delete_by_user(user_id).await {
            Ok(count) => {
                tracing::debug!(user_id, count, "Deleted verification tokens for user");
                true
            }
            Err(e) => {
                tracing::error!(user_id, error = %e, "Failed to delete user verification tokens");
                false
            }
        }
    }

    /// Newest token for the user that is still unused and unexpired.
    pub async fn get_latest_unused_for_user(&self, user_id: DbId) -> Option<VerificationToken> {
        match self
            .repo
            .latest_unused_for_user(user_id, self.clock.now())
            .await
        {
            Ok(token) => token,
            Err(e) => {
                tracing::error!(user_id, error = %e, "Failed to look up active verification token");
                None
            }
        }
    }

    /// Whether the backing store is reachable.
    pub async fn is_healthy(&self) -> bool {
        self.repo.health_check().await.is_ok()
    }
}
