//! Request extractors.
//!
//! - [`auth::AuthUser`] -- the caller identified by a JWT Bearer token.

pub mod auth;
