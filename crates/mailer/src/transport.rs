//! Outbound transports.
//!
//! [`MailTransport`] is the seam between message assembly and the wire.
//! [`SmtpRelay`] talks to a real server; lettre's `AsyncStubTransport` is
//! accepted as-is so tests can inspect what was sent.

use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::stub::AsyncStubTransport;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::{SmtpConfig, SmtpSecurity};
use crate::error::EmailError;

/// Something that can deliver a fully built [`Message`].
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send_message(&self, message: Message) -> Result<(), EmailError>;

    /// Open a session and issue a `NOOP`. `Ok(false)` means the server
    /// answered but did not accept the probe.
    async fn test_connection(&self) -> Result<bool, EmailError>;
}

/// SMTP relay built from [`SmtpConfig`].
///
/// A transport is assembled per call; verification traffic is low and this
/// keeps a dead connection from outliving a config change on the server side.
#[derive(Debug, Clone)]
pub struct SmtpRelay {
    config: SmtpConfig,
}

impl SmtpRelay {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    fn build(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, EmailError> {
        let host = self.config.host.as_str();
        let builder = match self.config.security {
            SmtpSecurity::Implicit => AsyncSmtpTransport::<Tokio1Executor>::relay(host)?,
            SmtpSecurity::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?,
            SmtpSecurity::Plain => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host),
        };

        let mut builder = builder
            .port(self.config.port)
            .timeout(Some(self.config.timeout));

        if let Some((user, pass)) = self.config.credentials() {
            builder = builder.credentials(Credentials::new(user.to_string(), pass.to_string()));
        }

        Ok(builder.build())
    }
}

#[async_trait]
impl MailTransport for SmtpRelay {
    async fn send_message(&self, message: Message) -> Result<(), EmailError> {
        self.build()?.send(message).await?;
        Ok(())
    }

    async fn test_connection(&self) -> Result<bool, EmailError> {
        Ok(self.build()?.test_connection().await?)
    }
}

#[async_trait]
impl MailTransport for AsyncStubTransport {
    async fn send_message(&self, message: Message) -> Result<(), EmailError> {
        AsyncTransport::send(self, message)
            .await
            .map_err(|e| EmailError::Stub(e.to_string()))
    }

    async fn test_connection(&self) -> Result<bool, EmailError> {
        Ok(true)
    }
}
