pub mod email_verification;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /email-verification/status      GET   caller's verification state (auth)
/// /email-verification/verify      POST  redeem an emailed token
/// /email-verification/resend      POST  issue and mail a fresh token
/// /email-verification/required    GET   whether verification gates sign-in
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/email-verification", email_verification::router())
}
