//! Shared building blocks for the email verification workspace.
//!
//! This crate has no internal dependencies so the storage, mailer, and API
//! crates can all build on it.

pub mod clock;
pub mod config;
pub mod error;
pub mod secret;
pub mod types;
pub mod verification;
