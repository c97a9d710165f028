//! Storage seams and their PostgreSQL implementations.

mod user_repo;
mod verification_token_repo;

pub use user_repo::{PgUserDirectory, UserDirectory};
pub use verification_token_repo::{PgTokenRepository, TokenRepository};
