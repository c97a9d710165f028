//! Handlers for email verification.
//!
//! `/verify` and `/resend` are public: the caller proves ownership of an
//! address by presenting the emailed secret, not a session. `/status` reports
//! on the authenticated caller.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use verimail_core::error::CoreError;
use verimail_core::verification::normalize_email;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Returned for every accepted resend, whether or not the address is known.
pub const RESEND_MESSAGE: &str = "If the email exists, a verification link has been sent";

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct ResendVerificationRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct VerificationStatusResponse {
    pub enabled: bool,
    pub email_verified: bool,
}

#[derive(Debug, Serialize)]
pub struct VerifyEmailResponse {
    pub success: bool,
    pub message: &'static str,
    pub email_verified: bool,
}

#[derive(Debug, Serialize)]
pub struct ResendVerificationResponse {
    pub success: bool,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct VerificationRequiredResponse {
    pub required: bool,
    pub configured: bool,
}

/// Reject requests that cannot be served: the feature is off, or mail is
/// not set up.
fn ensure_available(state: &AppState) -> AppResult<()> {
    if !state.config.verification.enabled {
        return Err(AppError::BadRequest(
            "Email verification is not enabled".to_string(),
        ));
    }
    if !state.mailer.is_configured() {
        return Err(AppError::NotConfigured(
            "Email is not properly configured".to_string(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Endpoints
// ---------------------------------------------------------------------------

/// GET /api/v1/email-verification/status
///
/// With the feature disabled every user reports as verified, without a
/// directory lookup.
pub async fn status(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<VerificationStatusResponse>> {
    if !state.config.verification.enabled {
        return Ok(Json(VerificationStatusResponse {
            enabled: false,
            email_verified: true,
        }));
    }

    let record = state
        .users
        .find_by_id(user.user_id)
        .await?
        .ok_or_else(|| CoreError::NotFound {
            entity: "User",
            id: user.user_id.to_string(),
        })?;

    Ok(Json(VerificationStatusResponse {
        enabled: state.mailer.is_configured(),
        email_verified: record.email_verified,
    }))
}

/// POST /api/v1/email-verification/verify
///
/// The token is consumed only after the user row has been updated, so a
/// failed update leaves the link usable.
pub async fn verify(
    State(state): State<AppState>,
    Json(input): Json<VerifyEmailRequest>,
) -> AppResult<Json<VerifyEmailResponse>> {
    ensure_available(&state)?;

    let secret = input.token.trim();
    let user_id = state.tokens.validate(secret).await.map_err(|rejection| {
        tracing::info!(reason = rejection.reason(), "Verification token rejected");
        rejection
    })?;

    let user = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| CoreError::NotFound {
            entity: "User",
            id: user_id.to_string(),
        })?;

    let updated = state
        .users
        .mark_email_verified(user.id, state.clock.now())
        .await?
        .ok_or_else(|| {
            AppError::InternalError("Failed to update user verification status".to_string())
        })?;

    if !state.tokens.mark_used(secret).await {
        tracing::warn!(user_id, "Verification token was not marked used after verifying");
    }

    if let Err(e) = state
        .mailer
        .send_welcome_email(&updated.email, &updated.name)
        .await
    {
        tracing::warn!(user_id, error = %e, "Failed to send welcome email");
    }

    tracing::info!(user_id, "Email verified");

    Ok(Json(VerifyEmailResponse {
        success: true,
        message: "Email verified successfully",
        email_verified: true,
    }))
}

/// POST /api/v1/email-verification/resend
///
/// Unknown addresses get the same answer as known ones and no mail is sent.
pub async fn resend(
    State(state): State<AppState>,
    Json(input): Json<ResendVerificationRequest>,
) -> AppResult<Json<ResendVerificationResponse>> {
    ensure_available(&state)?;

    let email = normalize_email(&input.email);
    if email.is_empty() {
        return Err(CoreError::Validation("Email is required".to_string()).into());
    }

    let accepted = Json(ResendVerificationResponse {
        success: true,
        message: RESEND_MESSAGE,
    });

    let Some(user) = state.users.find_by_email(&email).await? else {
        tracing::debug!("Verification resend requested for unknown address");
        return Ok(accepted);
    };

    if user.email_verified {
        return Err(AppError::BadRequest("Email is already verified".to_string()));
    }

    // Only the digest of an outstanding token is stored, so it cannot be
    // re-sent; a fresh token replaces it.
    let superseded = state
        .tokens
        .get_latest_unused_for_user(user.id)
        .await
        .map(|active| active.id);

    let ttl = state.config.verification.token_ttl_secs;
    let issued = state
        .tokens
        .create_token(user.id, &user.email, ttl)
        .await
        .ok_or_else(|| AppError::InternalError("Failed to create verification token".to_string()))?;

    state
        .mailer
        .send_verification_email(
            &user.email,
            &user.name,
            &issued.secret,
            &state.config.verification.base_url,
            ttl,
        )
        .await?;

    tracing::info!(
        user_id = user.id,
        token_id = %issued.token.id,
        superseded = ?superseded,
        "Verification email sent"
    );

    Ok(accepted)
}

/// GET /api/v1/email-verification/required
pub async fn required(State(state): State<AppState>) -> Json<VerificationRequiredResponse> {
    let configured = state.mailer.is_configured();
    Json(VerificationRequiredResponse {
        required: state.config.verification.enabled && configured,
        configured,
    })
}
