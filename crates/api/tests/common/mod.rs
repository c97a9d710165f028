//! Shared fixtures for API integration tests.
//!
//! The app runs on the in-memory storage seams, a manual clock, and lettre's
//! stub transport, so no database or mail server is needed.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use lettre::transport::stub::AsyncStubTransport;
use tower::ServiceExt;
use verimail_api::auth::jwt::{generate_access_token, JwtConfig};
use verimail_api::config::{ServerConfig, VerificationConfig};
use verimail_api::router::build_app_router;
use verimail_api::state::AppState;
use verimail_core::clock::ManualClock;
use verimail_db::memory::{MemoryTokenRepository, MemoryUserDirectory};
use verimail_db::models::user::{CreateUser, User};
use verimail_db::repositories::UserDirectory;
use verimail_db::TokenStore;
use verimail_mailer::{Mailer, SmtpConfig};

pub const VERIFY_URL: &str = "http://localhost:8080/auth/verify";

/// A configuration with verification switched on and SMTP pointed at a
/// host that is never contacted.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        jwt: JwtConfig {
            secret: "integration-test-secret".to_string(),
            access_token_expiry_mins: 15,
        },
        verification: VerificationConfig {
            enabled: true,
            base_url: VERIFY_URL.to_string(),
            token_ttl_secs: 3600,
            sweep_interval_secs: 3600,
        },
        smtp: SmtpConfig {
            host: "smtp.test".to_string(),
            from_email: "noreply@verimail.test".to_string(),
            ..SmtpConfig::default()
        },
    }
}

/// Everything a test needs to drive and observe the app.
pub struct TestApp {
    pub router: Router,
    pub config: ServerConfig,
    pub users: Arc<MemoryUserDirectory>,
    pub token_rows: Arc<MemoryTokenRepository>,
    pub tokens: TokenStore,
    pub clock: Arc<ManualClock>,
    pub outbox: AsyncStubTransport,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with(test_config(), AsyncStubTransport::new_ok())
    }

    pub fn with_config(config: ServerConfig) -> Self {
        Self::with(config, AsyncStubTransport::new_ok())
    }

    /// Build with an explicit transport (e.g. `AsyncStubTransport::new_error()`).
    pub fn with(config: ServerConfig, outbox: AsyncStubTransport) -> Self {
        let users = Arc::new(MemoryUserDirectory::new());
        let token_rows = Arc::new(MemoryTokenRepository::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let tokens = TokenStore::new(token_rows.clone(), clock.clone());
        let mailer = Mailer::with_transport(config.smtp.clone(), Arc::new(outbox.clone()));

        let state = AppState {
            config: Arc::new(config.clone()),
            tokens: Arc::new(tokens.clone()),
            users: users.clone(),
            mailer: Arc::new(mailer),
            clock: clock.clone(),
        };

        Self {
            router: build_app_router(state, &config),
            config,
            users,
            token_rows,
            tokens,
            clock,
            outbox,
        }
    }

    pub async fn create_user(&self, email: &str, name: &str, verified: bool) -> User {
        self.users
            .create(&CreateUser {
                email: email.to_string(),
                name: name.to_string(),
                email_verified: verified,
            })
            .await
            .expect("user creation should succeed")
    }

    pub fn bearer_for(&self, user_id: i64) -> String {
        generate_access_token(user_id, &self.config.jwt).expect("token generation should succeed")
    }

    pub async fn sent_count(&self) -> usize {
        self.outbox.messages().await.len()
    }

    pub fn app(&self) -> Router {
        self.router.clone()
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Pull the `token=` value out of the verification link in a raw message.
///
/// Long bodies go out quoted-printable, so soft line breaks and the escaped
/// `=` are undone first.
pub fn secret_from_message(raw: &str) -> String {
    let decoded = raw.replace("=\r\n", "").replace("=3D", "=");
    let marker = format!("{VERIFY_URL}?token=");
    let start = decoded.find(&marker).expect("message should contain the link") + marker.len();
    decoded[start..]
        .chars()
        .take_while(|c| c.is_ascii_hexdigit())
        .collect()
}
