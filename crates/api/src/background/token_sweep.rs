//! Periodic purge of expired verification tokens.
//!
//! Expired rows are already rejected by validation; the sweep only keeps the
//! table small. It is safe to run alongside request traffic.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use verimail_db::TokenStore;

/// Run the sweep every `every` until `cancel` fires.
///
/// The first pass happens immediately.
pub async fn run(tokens: TokenStore, every: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = every.as_secs(), "Verification token sweep started");

    let mut interval = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Verification token sweep stopping");
                break;
            }
            _ = interval.tick() => {
                let deleted = tokens.delete_expired().await;
                if deleted > 0 {
                    tracing::info!(deleted, "Token sweep: purged expired tokens");
                } else {
                    tracing::debug!("Token sweep: nothing to purge");
                }
            }
        }
    }
}
