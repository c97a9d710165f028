//! Message assembly and dispatch.

use std::sync::Arc;

use lettre::message::{Mailbox, MultiPart};
use lettre::Message;

use crate::config::SmtpConfig;
use crate::error::EmailError;
use crate::templates::{self, RenderedEmail};
use crate::text::html_to_text;
use crate::transport::{MailTransport, SmtpRelay};

/// Sends the verification flow's emails.
///
/// Safe to share across tasks; the transport is behind an `Arc`.
#[derive(Clone)]
pub struct Mailer {
    config: SmtpConfig,
    transport: Arc<dyn MailTransport>,
}

impl Mailer {
    /// Mailer that delivers through SMTP as described by `config`.
    pub fn new(config: SmtpConfig) -> Self {
        let transport = Arc::new(SmtpRelay::new(config.clone()));
        Self { config, transport }
    }

    /// Mailer with a caller-supplied transport.
    pub fn with_transport(config: SmtpConfig, transport: Arc<dyn MailTransport>) -> Self {
        Self { config, transport }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Send an HTML message with a plain-text alternative.
    ///
    /// When `text` is `None` the alternative is derived from `html`.
    pub async fn send(
        &self,
        to: &str,
        subject: &str,
        html: &str,
        text: Option<&str>,
    ) -> Result<(), EmailError> {
        if !self.is_configured() {
            tracing::warn!(to, "Email is not configured, skipping send");
            return Err(EmailError::NotConfigured);
        }

        let message = self.build_message(to, subject, html, text)?;
        match self.transport.send_message(message).await {
            Ok(()) => {
                tracing::info!(to, subject, "Email sent");
                Ok(())
            }
            Err(e) => {
                tracing::error!(to, subject, error = %e, "Failed to send email");
                Err(e)
            }
        }
    }

    fn build_message(
        &self,
        to: &str,
        subject: &str,
        html: &str,
        text: Option<&str>,
    ) -> Result<Message, EmailError> {
        let from = Mailbox::new(
            Some(self.config.from_name.clone()),
            self.config.from_email.parse()?,
        );
        let to: Mailbox = to.parse()?;
        let text = text.map_or_else(|| html_to_text(html), str::to_string);

        Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .multipart(MultiPart::alternative_plain_html(text, html.to_string()))
            .map_err(|e| EmailError::Build(e.to_string()))
    }

    async fn send_rendered(&self, to: &str, email: RenderedEmail) -> Result<(), EmailError> {
        self.send(to, &email.subject, &email.html, Some(&email.text))
            .await
    }

    /// Send the link built from `base_url` and `secret`.
    pub async fn send_verification_email(
        &self,
        to: &str,
        user_name: &str,
        secret: &str,
        base_url: &str,
        expires_in_secs: i64,
    ) -> Result<(), EmailError> {
        let link = templates::verification_link(base_url, secret);
        let email =
            templates::verification_email(&self.config.from_name, user_name, &link, expires_in_secs);
        self.send_rendered(to, email).await
    }

    pub async fn send_welcome_email(&self, to: &str, user_name: &str) -> Result<(), EmailError> {
        let email = templates::welcome_email(&self.config.from_name, user_name);
        self.send_rendered(to, email).await
    }

    /// Send a short message confirming outbound mail works.
    pub async fn send_test_email(&self, to: &str) -> Result<(), EmailError> {
        let email = templates::test_email(&self.config.from_name);
        self.send_rendered(to, email).await
    }

    /// Probe the server without sending anything.
    pub async fn test_connection(&self) -> Result<bool, EmailError> {
        if !self.is_configured() {
            return Err(EmailError::NotConfigured);
        }
        self.transport.test_connection().await
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use lettre::transport::stub::AsyncStubTransport;

    use super::*;

    fn configured() -> SmtpConfig {
        SmtpConfig {
            host: "smtp.test".to_string(),
            from_email: "noreply@verimail.test".to_string(),
            ..SmtpConfig::default()
        }
    }

    #[tokio::test]
    async fn unconfigured_mailer_refuses_without_touching_transport() {
        let stub = AsyncStubTransport::new_ok();
        let mailer = Mailer::with_transport(SmtpConfig::default(), Arc::new(stub.clone()));

        let result = mailer.send("a@b.test", "Hi", "<p>Hi</p>", None).await;
        assert_matches!(result, Err(EmailError::NotConfigured));
        assert_matches!(mailer.test_connection().await, Err(EmailError::NotConfigured));
        assert!(stub.messages().await.is_empty());
    }

    #[tokio::test]
    async fn invalid_recipient_is_an_address_error() {
        let stub = AsyncStubTransport::new_ok();
        let mailer = Mailer::with_transport(configured(), Arc::new(stub.clone()));

        let result = mailer.send("not an address", "Hi", "<p>Hi</p>", None).await;
        assert_matches!(result, Err(EmailError::Address(_)));
        assert!(stub.messages().await.is_empty());
    }

    #[tokio::test]
    async fn sender_header_uses_display_name() {
        let stub = AsyncStubTransport::new_ok();
        let mailer = Mailer::with_transport(configured(), Arc::new(stub.clone()));

        mailer
            .send("a@b.test", "Hello", "<p>Body</p>", None)
            .await
            .unwrap();

        let messages = stub.messages().await;
        assert_eq!(messages.len(), 1);
        let (envelope, raw) = &messages[0];
        assert_eq!(envelope.to()[0].to_string(), "a@b.test");
        assert!(raw.contains("From: Verimail <noreply@verimail.test>"));
        assert!(raw.contains("multipart/alternative"));
    }

    #[tokio::test]
    async fn transport_failure_is_reported() {
        let mailer = Mailer::with_transport(configured(), Arc::new(AsyncStubTransport::new_error()));
        let result = mailer.send_welcome_email("a@b.test", "Ada").await;
        assert_matches!(result, Err(EmailError::Stub(_)));
    }
}
