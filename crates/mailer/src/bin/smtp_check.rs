//! `smtp-check` -- verify outbound mail settings.
//!
//! Prints the effective SMTP configuration (password masked), opens a
//! session against the server, and optionally sends a test message.
//!
//! ```text
//! smtp-check                    # connection probe only
//! smtp-check ops@example.com    # probe, then send a test email
//! ```
//!
//! Exits non-zero if the configuration is incomplete or any step fails.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use verimail_mailer::{Mailer, SmtpConfig, SmtpSecurity};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "smtp_check=info,verimail_mailer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = SmtpConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid SMTP configuration");
        std::process::exit(1);
    });

    print_settings(&config);

    if !config.is_configured() {
        tracing::error!("SMTP_HOST, SMTP_PORT and SMTP_FROM_EMAIL must all be set");
        std::process::exit(1);
    }

    let mailer = Mailer::new(config);

    match mailer.test_connection().await {
        Ok(true) => tracing::info!("SMTP connection succeeded"),
        Ok(false) => {
            tracing::error!("SMTP server rejected the connection probe");
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!(error = %e, "SMTP connection failed");
            std::process::exit(1);
        }
    }

    if let Some(recipient) = std::env::args().nth(1) {
        if let Err(e) = mailer.send_test_email(&recipient).await {
            tracing::error!(error = %e, %recipient, "Test email failed");
            std::process::exit(1);
        }
        tracing::info!(%recipient, "Test email sent");
    }
}

fn print_settings(config: &SmtpConfig) {
    let security = match config.security {
        SmtpSecurity::Plain => "none",
        SmtpSecurity::StartTls => "STARTTLS",
        SmtpSecurity::Implicit => "implicit TLS",
    };
    let password = if config.password.is_some() { "********" } else { "(unset)" };

    println!("SMTP settings");
    println!("  host:      {}", or_unset(&config.host));
    println!("  port:      {}", config.port);
    println!("  security:  {security}");
    println!("  username:  {}", config.username.as_deref().unwrap_or("(unset)"));
    println!("  password:  {password}");
    println!("  from:      {} <{}>", config.from_name, or_unset(&config.from_email));
    println!("  timeout:   {}s", config.timeout.as_secs());
}

fn or_unset(value: &str) -> &str {
    if value.is_empty() {
        "(unset)"
    } else {
        value
    }
}
