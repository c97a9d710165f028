use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use verimail_core::clock::{Clock, SystemClock};
use verimail_core::config as env_config;
use verimail_db::repositories::{PgTokenRepository, PgUserDirectory};
use verimail_db::TokenStore;
use verimail_mailer::Mailer;

use verimail_api::background::token_sweep;
use verimail_api::config::ServerConfig;
use verimail_api::router::build_app_router;
use verimail_api::state::AppState;

/// Log `msg` and exit non-zero.
fn fatal(msg: &str, error: impl std::fmt::Display) -> ! {
    tracing::error!(error = %error, "{msg}");
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "verimail_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env().unwrap_or_else(|e| fatal("Invalid configuration", e));
    tracing::info!(
        host = %config.host,
        port = config.port,
        verification_enabled = config.verification.enabled,
        smtp_configured = config.smtp.is_configured(),
        "Loaded server configuration"
    );
    if config.verification.enabled && !config.smtp.is_configured() {
        tracing::warn!("Email verification is enabled but SMTP is not configured; endpoints will refuse requests");
    }

    // --- Database ---
    let database_url = env_config::required(&env_config::process_env, "DATABASE_URL")
        .unwrap_or_else(|e| fatal("Missing database configuration", e));

    let pool = verimail_db::create_pool(&database_url)
        .await
        .unwrap_or_else(|e| fatal("Failed to connect to database", e));
    tracing::info!("Database connection pool created");

    verimail_db::health_check(&pool)
        .await
        .unwrap_or_else(|e| fatal("Database health check failed", e));

    verimail_db::run_migrations(&pool)
        .await
        .unwrap_or_else(|e| fatal("Failed to run database migrations", e));
    tracing::info!("Database migrations applied");

    // --- Services ---
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let tokens = TokenStore::new(Arc::new(PgTokenRepository::new(pool.clone())), clock.clone());
    let mailer = Mailer::new(config.smtp.clone());

    // --- Expiry sweep ---
    let sweep_cancel = CancellationToken::new();
    let sweep_handle = tokio::spawn(token_sweep::run(
        tokens.clone(),
        Duration::from_secs(config.verification.sweep_interval_secs),
        sweep_cancel.clone(),
    ));

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        tokens: Arc::new(tokens),
        users: Arc::new(PgUserDirectory::new(pool)),
        mailer: Arc::new(mailer),
        clock,
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let host: std::net::IpAddr = config
        .host
        .parse()
        .unwrap_or_else(|e| fatal("Invalid HOST address", e));
    let addr = SocketAddr::new(host, config.port);
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| fatal("Failed to bind to address", e));

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server error");
    }

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    sweep_cancel.cancel();
    let grace = Duration::from_secs(config.shutdown_timeout_secs);
    if tokio::time::timeout(grace, sweep_handle).await.is_err() {
        tracing::warn!("Token sweep did not stop in time");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or (on Unix) SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
