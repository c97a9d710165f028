/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// Host, port, or sender address is missing.
    #[error("Email is not configured")]
    NotConfigured,

    /// SMTP transport-level failure (authentication, connection, timeout, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),

    /// The in-memory stub transport was configured to fail.
    #[error("Stub transport error: {0}")]
    Stub(String),
}
