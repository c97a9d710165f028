pub mod user;
pub mod verification_token;
