use std::sync::Arc;

use verimail_core::clock::Clock;
use verimail_db::repositories::UserDirectory;
use verimail_db::TokenStore;
use verimail_mailer::Mailer;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone; everything inside is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Verification token lifecycle.
    pub tokens: Arc<TokenStore>,
    /// User lookup and the `email_verified` flag.
    pub users: Arc<dyn UserDirectory>,
    pub mailer: Arc<Mailer>,
    /// Time source for verification timestamps.
    pub clock: Arc<dyn Clock>,
}
