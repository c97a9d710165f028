//! SMTP settings.

use std::time::Duration;

use verimail_core::config::{self, ConfigError, EnvLookup};

/// Default SMTP port (STARTTLS submission).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default display name on outgoing mail.
const DEFAULT_FROM_NAME: &str = "Verimail";

/// Connect and command timeout applied to every SMTP session.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// How the SMTP session is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpSecurity {
    /// No TLS at all. Only sensible for a local relay.
    Plain,
    /// Plain connect, then upgrade with `STARTTLS`.
    StartTls,
    /// TLS from the first byte (SMTPS, usually port 465).
    Implicit,
}

/// Configuration for outbound SMTP.
///
/// Built once at start-up and handed to [`crate::Mailer`]; nothing in this
/// crate reads the process environment on its own.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    /// SMTP server hostname. Empty means unset.
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Envelope and header sender address. Empty means unset.
    pub from_email: String,
    pub from_name: String,
    pub security: SmtpSecurity,
    pub timeout: Duration,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_SMTP_PORT,
            username: None,
            password: None,
            from_email: String::new(),
            from_name: DEFAULT_FROM_NAME.to_string(),
            security: SmtpSecurity::StartTls,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl SmtpConfig {
    /// Load from the process environment. See [`SmtpConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&config::process_env)
    }

    /// Load from an arbitrary key/value source.
    ///
    /// | Variable            | Default    |
    /// |---------------------|------------|
    /// | `SMTP_HOST`         | (unset)    |
    /// | `SMTP_PORT`         | `587`      |
    /// | `SMTP_USERNAME`     | (unset)    |
    /// | `SMTP_PASSWORD`     | (unset)    |
    /// | `SMTP_FROM_EMAIL`   | (unset)    |
    /// | `SMTP_FROM_NAME`    | `Verimail` |
    /// | `SMTP_USE_TLS`      | `true`     |
    /// | `SMTP_USE_SSL`      | `false`    |
    /// | `SMTP_TIMEOUT_SECS` | `10`       |
    ///
    /// `SMTP_USE_SSL` takes precedence over `SMTP_USE_TLS`.
    pub fn from_lookup(lookup: EnvLookup<'_>) -> Result<Self, ConfigError> {
        let use_tls = config::flag_or(lookup, "SMTP_USE_TLS", true)?;
        let use_ssl = config::flag_or(lookup, "SMTP_USE_SSL", false)?;
        let security = match (use_ssl, use_tls) {
            (true, _) => SmtpSecurity::Implicit,
            (false, true) => SmtpSecurity::StartTls,
            (false, false) => SmtpSecurity::Plain,
        };

        let timeout_secs: u64 =
            config::parse_or(lookup, "SMTP_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS, "seconds")?;

        Ok(Self {
            host: config::string_or(lookup, "SMTP_HOST", ""),
            port: config::parse_or(lookup, "SMTP_PORT", DEFAULT_SMTP_PORT, "a port number")?,
            username: config::optional(lookup, "SMTP_USERNAME"),
            password: config::optional(lookup, "SMTP_PASSWORD"),
            from_email: config::string_or(lookup, "SMTP_FROM_EMAIL", ""),
            from_name: config::string_or(lookup, "SMTP_FROM_NAME", DEFAULT_FROM_NAME),
            security,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// True iff host, port, and sender address are all set.
    pub fn is_configured(&self) -> bool {
        !self.host.is_empty() && self.port != 0 && !self.from_email.is_empty()
    }

    /// Credentials are only used when both halves are present.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some((user.as_str(), pass.as_str())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<SmtpConfig, ConfigError> {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        SmtpConfig::from_lookup(&|key: &str| map.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn defaults_without_any_settings() {
        let config = load(&[]).unwrap();
        assert!(!config.is_configured());
        assert_eq!(config.port, 587);
        assert_eq!(config.from_name, "Verimail");
        assert_eq!(config.security, SmtpSecurity::StartTls);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert!(config.credentials().is_none());
    }

    #[test]
    fn configured_needs_host_and_sender() {
        let only_host = load(&[("SMTP_HOST", "smtp.example.com")]).unwrap();
        assert!(!only_host.is_configured());

        let full = load(&[
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_FROM_EMAIL", "noreply@example.com"),
        ])
        .unwrap();
        assert!(full.is_configured());
    }

    #[test]
    fn ssl_overrides_tls() {
        let config = load(&[("SMTP_USE_SSL", "true"), ("SMTP_USE_TLS", "true")]).unwrap();
        assert_eq!(config.security, SmtpSecurity::Implicit);

        let plain = load(&[("SMTP_USE_TLS", "false")]).unwrap();
        assert_eq!(plain.security, SmtpSecurity::Plain);
    }

    #[test]
    fn credentials_require_both_halves() {
        let half = load(&[("SMTP_USERNAME", "bot")]).unwrap();
        assert!(half.credentials().is_none());

        let both = load(&[("SMTP_USERNAME", "bot"), ("SMTP_PASSWORD", "pw")]).unwrap();
        assert_eq!(both.credentials(), Some(("bot", "pw")));
    }

    #[test]
    fn malformed_port_is_an_error() {
        let err = load(&[("SMTP_PORT", "smtp")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "SMTP_PORT", .. }));
    }
}
