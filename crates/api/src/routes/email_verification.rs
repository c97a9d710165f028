use axum::routing::{get, post};
use axum::Router;

use crate::handlers::email_verification;
use crate::state::AppState;

/// Routes mounted at `/email-verification`.
///
/// ```text
/// GET  /status    -> status
/// POST /verify    -> verify
/// POST /resend    -> resend
/// GET  /required  -> required
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status", get(email_verification::status))
        .route("/verify", post(email_verification::verify))
        .route("/resend", post(email_verification::resend))
        .route("/required", get(email_verification::required))
}
