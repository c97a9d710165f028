//! Pure rules for the verification token lifecycle.

use crate::types::Timestamp;

/// Why a presented secret was not accepted.
///
/// The display strings are user-facing; [`TokenRejection::reason`] gives the
/// short machine-readable form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenRejection {
    #[error("Invalid verification token")]
    NotFound,

    #[error("Verification token already used")]
    AlreadyUsed,

    #[error("Verification token has expired")]
    Expired,
}

impl TokenRejection {
    pub fn reason(&self) -> &'static str {
        match self {
            TokenRejection::NotFound => "not found",
            TokenRejection::AlreadyUsed => "already used",
            TokenRejection::Expired => "expired",
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            TokenRejection::NotFound => "INVALID_TOKEN",
            TokenRejection::AlreadyUsed => "TOKEN_ALREADY_USED",
            TokenRejection::Expired => "TOKEN_EXPIRED",
        }
    }
}

/// Decide whether a stored token may still be redeemed at `now`.
///
/// A token is redeemable iff it has not been consumed and `now < expires_at`.
/// Consumption is reported ahead of expiry.
pub fn evaluate(used: bool, expires_at: Timestamp, now: Timestamp) -> Result<(), TokenRejection> {
    if used {
        return Err(TokenRejection::AlreadyUsed);
    }
    if now >= expires_at {
        return Err(TokenRejection::Expired);
    }
    Ok(())
}

/// Canonical form used for email lookups.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{TimeDelta, Utc};

    use super::*;

    #[test]
    fn fresh_unused_token_is_accepted() {
        let now = Utc::now();
        assert_matches!(evaluate(false, now + TimeDelta::hours(1), now), Ok(()));
    }

    #[test]
    fn token_expires_exactly_at_deadline() {
        let now = Utc::now();
        assert_matches!(evaluate(false, now, now), Err(TokenRejection::Expired));
        assert_matches!(
            evaluate(false, now - TimeDelta::seconds(1), now),
            Err(TokenRejection::Expired)
        );
    }

    #[test]
    fn used_wins_over_expired() {
        let now = Utc::now();
        assert_matches!(
            evaluate(true, now - TimeDelta::hours(1), now),
            Err(TokenRejection::AlreadyUsed)
        );
    }

    #[test]
    fn rejection_reasons() {
        assert_eq!(TokenRejection::NotFound.reason(), "not found");
        assert_eq!(TokenRejection::AlreadyUsed.reason(), "already used");
        assert_eq!(TokenRejection::Expired.reason(), "expired");
        assert_eq!(
            TokenRejection::Expired.to_string(),
            "Verification token has expired"
        );
    }

    #[test]
    fn emails_are_trimmed_and_lowercased() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }
}
