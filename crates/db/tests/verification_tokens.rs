//! PostgreSQL integration tests for the verification schema and repositories.
//!
//! `#[sqlx::test]` provisions a fresh database per test from `DATABASE_URL`.

use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use sqlx::PgPool;
use verimail_core::clock::ManualClock;
use verimail_core::verification::TokenRejection;
use verimail_db::models::user::CreateUser;
use verimail_db::repositories::{PgTokenRepository, PgUserDirectory, UserDirectory};
use verimail_db::TokenStore;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn create_user(pool: &PgPool, email: &str, verified: bool) -> verimail_db::models::user::User {
    PgUserDirectory::new(pool.clone())
        .create(&CreateUser {
            email: email.to_string(),
            name: "Test User".to_string(),
            email_verified: verified,
        })
        .await
        .expect("user creation should succeed")
}

fn store(pool: &PgPool, clock: Arc<ManualClock>) -> TokenStore {
    TokenStore::new(Arc::new(PgTokenRepository::new(pool.clone())), clock)
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Rows inserted without an explicit flag start unverified.
#[sqlx::test(migrations = "../../db/migrations")]
async fn new_users_default_to_unverified(pool: PgPool) {
    sqlx::query("INSERT INTO users (email, name) VALUES ('raw@test.com', 'Raw')")
        .execute(&pool)
        .await
        .unwrap();

    let verified: (bool,) = sqlx::query_as("SELECT email_verified FROM users WHERE email = 'raw@test.com'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(!verified.0);
}

/// The table refuses rows whose expiry is not after their creation time.
#[sqlx::test(migrations = "../../db/migrations")]
async fn expiry_must_follow_creation(pool: PgPool) {
    let user = create_user(&pool, "check@test.com", false).await;
    let now = Utc::now();

    let result = sqlx::query(
        "INSERT INTO email_verification_tokens (id, user_id, token_hash, email, expires_at, created_at)
         VALUES ($1, $2, 'h', 'check@test.com', $3, $3)",
    )
    .bind(uuid::Uuid::new_v4())
    .bind(user.id)
    .bind(now)
    .execute(&pool)
    .await;

    assert!(result.is_err(), "expires_at == created_at must be rejected");
}

/// Deleting a user cascades to their tokens.
#[sqlx::test(migrations = "../../db/migrations")]
async fn deleting_user_cascades_to_tokens(pool: PgPool) {
    let user = create_user(&pool, "cascade@test.com", false).await;
    let tokens = store(&pool, Arc::new(ManualClock::default()));
    tokens.create_token(user.id, &user.email, 3600).await.unwrap();

    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user.id)
        .execute(&pool)
        .await
        .unwrap();

    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM email_verification_tokens")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count.0, 0);
}

// ---------------------------------------------------------------------------
// Token store over PostgreSQL
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn token_lifecycle(pool: PgPool) {
    let user = create_user(&pool, "life@test.com", false).await;
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let tokens = store(&pool, clock.clone());

    let first = tokens.create_token(user.id, &user.email, 3600).await.unwrap();
    assert_eq!(tokens.validate(&first.secret).await, Ok(user.id));

    let second = tokens.create_token(user.id, &user.email, 3600).await.unwrap();
    assert_eq!(
        tokens.validate(&first.secret).await,
        Err(TokenRejection::NotFound)
    );

    let active = tokens.get_latest_unused_for_user(user.id).await.unwrap();
    assert_eq!(active.id, second.token.id);

    assert!(tokens.mark_used(&second.secret).await);
    assert!(!tokens.mark_used(&second.secret).await);
    assert_eq!(
        tokens.validate(&second.secret).await,
        Err(TokenRejection::AlreadyUsed)
    );
    assert!(tokens.get_latest_unused_for_user(user.id).await.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn sweep_deletes_expired_rows(pool: PgPool) {
    let a = create_user(&pool, "a@test.com", false).await;
    let b = create_user(&pool, "b@test.com", false).await;
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let tokens = store(&pool, clock.clone());

    let short = tokens.create_token(a.id, &a.email, 60).await.unwrap();
    let long = tokens.create_token(b.id, &b.email, 7200).await.unwrap();

    clock.advance(TimeDelta::seconds(61));
    assert_eq!(
        tokens.validate(&short.secret).await,
        Err(TokenRejection::Expired)
    );
    assert_eq!(tokens.delete_expired().await, 1);
    assert_eq!(
        tokens.validate(&short.secret).await,
        Err(TokenRejection::NotFound)
    );
    assert_eq!(tokens.validate(&long.secret).await, Ok(b.id));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn user_lookup_ignores_case_and_verification_is_recorded(pool: PgPool) {
    let directory = PgUserDirectory::new(pool.clone());
    let user = create_user(&pool, "Mixed@Test.com", false).await;

    let found = directory.find_by_email("mixed@test.com").await.unwrap();
    assert_eq!(found.map(|u| u.id), Some(user.id));

    let at = Utc::now();
    let updated = directory
        .mark_email_verified(user.id, at)
        .await
        .unwrap()
        .expect("user should exist");
    assert!(updated.email_verified);
    assert!(updated.email_verified_at.is_some());

    assert!(directory.mark_email_verified(-1, at).await.unwrap().is_none());
}
