//! Verification token model and DTOs.

use sqlx::FromRow;
use verimail_core::types::{DbId, Timestamp, TokenId};

/// A row from the `email_verification_tokens` table.
///
/// Holds only the digest of the secret; the plaintext is returned once at
/// issuance via [`crate::IssuedToken`].
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct VerificationToken {
    pub id: TokenId,
    pub user_id: DbId,
    pub token_hash: String,
    /// Address the token was issued for.
    pub email: String,
    pub expires_at: Timestamp,
    pub used: bool,
    pub used_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// DTO for inserting a token.
#[derive(Debug, Clone)]
pub struct CreateVerificationToken {
    pub id: TokenId,
    pub user_id: DbId,
    pub token_hash: String,
    pub email: String,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
}
