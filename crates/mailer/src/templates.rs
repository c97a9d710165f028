//! Message bodies for the verification flow.
//!
//! Everything here is pure: callers pass in names and links, and get back a
//! subject plus HTML and plain-text bodies.

/// A rendered message, ready to hand to [`crate::Mailer::send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Append the token to the verification page URL.
pub fn verification_link(base_url: &str, secret: &str) -> String {
    let separator = if base_url.contains('?') { '&' } else { '?' };
    format!("{base_url}{separator}token={secret}")
}

/// Human wording for a token lifetime: whole hours, or minutes when the
/// lifetime is under an hour.
pub fn expiry_window(expires_in_secs: i64) -> String {
    let secs = expires_in_secs.max(0);
    if secs >= 3600 {
        plural(secs / 3600, "hour")
    } else {
        plural((secs / 60).max(1), "minute")
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

/// Escape the characters that matter inside element text and quoted
/// attributes.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn greeting_name(name: &str) -> &str {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        "there"
    } else {
        trimmed
    }
}

const STYLE: &str = "body{font-family:-apple-system,'Segoe UI',Roboto,Arial,sans-serif;\
line-height:1.6;color:#333;max-width:600px;margin:0 auto;padding:20px}\
.card{border-radius:8px;box-shadow:0 2px 4px rgba(0,0,0,.1);padding:32px}\
.button{display:inline-block;padding:12px 28px;background:#2563eb;color:#fff;\
text-decoration:none;border-radius:6px;font-weight:600}\
.link{word-break:break-all;font-size:14px;color:#2563eb}\
.footer{margin-top:24px;border-top:1px solid #e5e7eb;padding-top:16px;\
font-size:13px;color:#6b7280}";

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n\
         <title>{title}</title>\n<style>{STYLE}</style>\n</head>\n\
         <body>\n<div class=\"card\">\n{body}\n</div>\n</body>\n</html>\n"
    )
}

/// The message carrying the verification link.
pub fn verification_email(
    app_name: &str,
    user_name: &str,
    link: &str,
    expires_in_secs: i64,
) -> RenderedEmail {
    let name = greeting_name(user_name);
    let window = expiry_window(expires_in_secs);
    let app_html = escape_html(app_name);
    let link_html = escape_html(link);

    let html = page(
        "Verify Your Email",
        &format!(
            "<h1>Verify your email address</h1>\n\
             <p>Hello {name},</p>\n\
             <p>Thanks for signing up for {app_html}. Confirm your email address to finish setting up your account.</p>\n\
             <p><a class=\"button\" href=\"{link_html}\">Verify Email Address</a></p>\n\
             <p>If the button does not work, paste this link into your browser:</p>\n\
             <p class=\"link\">{link_html}</p>\n\
             <p><strong>This link expires in {window}.</strong></p>\n\
             <p>If you did not create an account, you can ignore this email.</p>\n\
             <div class=\"footer\">This is an automated message from {app_html}. Please do not reply.</div>",
            name = escape_html(name),
        ),
    );

    let text = format!(
        "Verify your email address\n\n\
         Hello {name},\n\n\
         Thanks for signing up for {app_name}. Confirm your email address by opening this link:\n\n\
         {link}\n\n\
         This link expires in {window}.\n\n\
         If you did not create an account, you can ignore this email.\n"
    );

    RenderedEmail {
        subject: "Verify Your Email Address".to_string(),
        html,
        text,
    }
}

/// Sent once the address has been confirmed.
pub fn welcome_email(app_name: &str, user_name: &str) -> RenderedEmail {
    let name = greeting_name(user_name);
    let app_html = escape_html(app_name);

    let html = page(
        "Welcome",
        &format!(
            "<h1>Email verified</h1>\n\
             <p>Hello {name},</p>\n\
             <p>Your email address is confirmed and your {app_html} account is fully active.</p>\n\
             <p>Thanks for joining us!</p>",
            name = escape_html(name),
        ),
    );

    let text = format!(
        "Email verified\n\n\
         Hello {name},\n\n\
         Your email address is confirmed and your {app_name} account is fully active.\n\n\
         Thanks for joining us!\n"
    );

    RenderedEmail {
        subject: "Welcome! Your Email is Verified".to_string(),
        html,
        text,
    }
}

/// Used by the `smtp-check` binary.
pub fn test_email(app_name: &str) -> RenderedEmail {
    let app_html = escape_html(app_name);
    let html = page(
        "SMTP Test",
        &format!(
            "<h1>SMTP test</h1>\n\
             <p>If you can read this, outgoing mail for {app_html} is working.</p>"
        ),
    );
    let text = format!("SMTP test\n\nIf you can read this, outgoing mail for {app_name} is working.\n");

    RenderedEmail {
        subject: format!("{app_name} SMTP test"),
        html,
        text,
    }
}
