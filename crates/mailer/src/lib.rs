//! Transactional email for the verification flow.
//!
//! [`Mailer`] renders the verification and welcome messages and hands them to
//! a [`MailTransport`]. Production uses [`SmtpRelay`]; tests plug in lettre's
//! stub transport to observe what would have been sent.

pub mod config;
pub mod delivery;
pub mod error;
pub mod templates;
pub mod text;
pub mod transport;

pub use config::{SmtpConfig, SmtpSecurity};
pub use delivery::Mailer;
pub use error::EmailError;
pub use transport::{MailTransport, SmtpRelay};
