use verimail_core::config::{self, ConfigError, EnvLookup};
use verimail_mailer::SmtpConfig;

use crate::auth::jwt::JwtConfig;

/// Email verification settings.
#[derive(Debug, Clone)]
pub struct VerificationConfig {
    /// Master switch for the feature.
    pub enabled: bool,
    /// Page the emailed link points at; the token is appended as a query
    /// parameter.
    pub base_url: String,
    /// Token lifetime in seconds. Always positive.
    pub token_ttl_secs: i64,
    /// How often the background sweep purges expired tokens.
    pub sweep_interval_secs: u64,
}

const DEFAULT_VERIFICATION_URL: &str = "http://localhost:8080/auth/verify";
const DEFAULT_TOKEN_TTL_SECS: i64 = 86_400;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3600;

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: DEFAULT_VERIFICATION_URL.to_string(),
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

impl VerificationConfig {
    /// | Env Var                                  | Default                             |
    /// |------------------------------------------|-------------------------------------|
    /// | `EMAIL_VERIFICATION_ENABLED`             | `false`                             |
    /// | `EMAIL_VERIFICATION_URL`                 | `http://localhost:8080/auth/verify` |
    /// | `EMAIL_VERIFICATION_TOKEN_EXPIRY`        | `86400`                             |
    /// | `EMAIL_VERIFICATION_SWEEP_INTERVAL_SECS` | `3600`                              |
    pub fn from_lookup(lookup: EnvLookup<'_>) -> Result<Self, ConfigError> {
        let token_ttl_secs: i64 = config::parse_or(
            lookup,
            "EMAIL_VERIFICATION_TOKEN_EXPIRY",
            DEFAULT_TOKEN_TTL_SECS,
            "a positive number of seconds",
        )?;
        if token_ttl_secs <= 0 {
            return Err(ConfigError::Invalid {
                key: "EMAIL_VERIFICATION_TOKEN_EXPIRY",
                value: token_ttl_secs.to_string(),
                expected: "a positive number of seconds",
            });
        }

        let sweep_interval_secs: u64 = config::parse_or(
            lookup,
            "EMAIL_VERIFICATION_SWEEP_INTERVAL_SECS",
            DEFAULT_SWEEP_INTERVAL_SECS,
            "a positive number of seconds",
        )?;
        if sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "EMAIL_VERIFICATION_SWEEP_INTERVAL_SECS",
                value: "0".to_string(),
                expected: "a positive number of seconds",
            });
        }

        Ok(Self {
            enabled: config::flag_or(lookup, "EMAIL_VERIFICATION_ENABLED", false)?,
            base_url: config::string_or(lookup, "EMAIL_VERIFICATION_URL", DEFAULT_VERIFICATION_URL),
            token_ttl_secs,
            sweep_interval_secs,
        })
    }
}

/// Server configuration, built once at start-up.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for background tasks (default: `30`).
    pub shutdown_timeout_secs: u64,
    pub jwt: JwtConfig,
    pub verification: VerificationConfig,
    pub smtp: SmtpConfig,
}

impl ServerConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&config::process_env)
    }

    /// | Env Var                 | Default                 |
    /// |-------------------------|-------------------------|
    /// | `HOST`                  | `0.0.0.0`               |
    /// | `PORT`                  | `3000`                  |
    /// | `CORS_ORIGINS`          | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`                    |
    ///
    /// Plus [`JwtConfig`], [`VerificationConfig`] and [`SmtpConfig`] settings.
    pub fn from_lookup(lookup: EnvLookup<'_>) -> Result<Self, ConfigError> {
        let cors_origins = config::string_or(lookup, "CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            host: config::string_or(lookup, "HOST", "0.0.0.0"),
            port: config::parse_or(lookup, "PORT", 3000, "a port number")?,
            cors_origins,
            request_timeout_secs: config::parse_or(lookup, "REQUEST_TIMEOUT_SECS", 30, "seconds")?,
            shutdown_timeout_secs: config::parse_or(lookup, "SHUTDOWN_TIMEOUT_SECS", 30, "seconds")?,
            jwt: JwtConfig::from_lookup(lookup)?,
            verification: VerificationConfig::from_lookup(lookup)?,
            smtp: SmtpConfig::from_lookup(lookup)?,
        })
    }
}
