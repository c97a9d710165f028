/// User primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// Verification token rows are keyed by an opaque UUID generated at issuance.
pub type TokenId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
