use lettre::message::header::ContentType;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;

#[derive(Debug, Error)]
pub enum SendError {
    /// A sender or recipient address could not be parsed.
    #[error("Invalid email address '{address}': {source}")]
    Address {
        address: String,
        source: lettre::address::AddressError,
    },
    /// The message could not be assembled.
    #[error("Failed to build email: {0}")]
    Message(#[from] lettre::error::Error),
    /// Connecting, authenticating or delivering over SMTP failed.
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

fn mailbox(address: &str) -> Result<Mailbox, SendError> {
    address.parse().map_err(|source| SendError::Address {
        address: address.to_string(),
        source,
    })
}

/// Builds the digest message.
///
/// With a text body the message is `multipart/alternative` (text first, so
/// clients prefer the HTML part); otherwise it is a single `text/html` part.
pub fn build_message(
    config: &EmailConfig,
    subject: &str,
    html_body: &str,
    text_body: Option<&str>,
) -> Result<Message, SendError> {
    let mut builder = Message::builder()
        .from(mailbox(&config.from)?)
        .subject(subject);
    for recipient in &config.to {
        builder = builder.to(mailbox(recipient)?);
    }

    let message = match text_body {
        Some(text) => builder.multipart(MultiPart::alternative_plain_html(
            text.to_string(),
            html_body.to_string(),
        ))?,
        None => builder
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())?,
    };
    Ok(message)
}

/// Sends the digest over SMTP.
///
/// Uses STARTTLS when `use_tls` is set. Credentials are only supplied when
/// both a username and a password are configured.
pub async fn send_digest(
    config: &EmailConfig,
    subject: &str,
    html_body: &str,
    text_body: Option<&str>,
) -> Result<(), SendError> {
    let message = build_message(config, subject, html_body, text_body)?;

    let transport = if config.use_tls {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
    };
    let mut transport = transport.port(config.smtp_port);

    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        transport = transport.credentials(Credentials::new(
            username.clone(),
            password.expose_secret().to_string(),
        ));
    }

    tracing::info!(
        host = %config.smtp_host,
        port = config.smtp_port,
        recipients = config.to.len(),
        tls = config.use_tls,
        "Sending digest email"
    );
    transport.build().send(message).await?;
    tracing::info!(subject = %subject, "Digest email sent");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email_config() -> EmailConfig {
        EmailConfig {
            smtp_host: "smtp.example.com".into(),
            smtp_port: 587,
            username: None,
            password: None,
            from: "Digest <digest@example.com>".into(),
            to: vec!["a@example.com".into(), "b@example.com".into()],
            subject: "Daily RSS Summary".into(),
            use_tls: true,
        }
    }

    fn formatted(message: &Message) -> String {
        String::from_utf8_lossy(&message.formatted()).into_owned()
    }

    #[test]
    fn test_html_only_message() {
        let message = build_message(&email_config(), "Subject line", "<p>Hi</p>", None).unwrap();
        let raw = formatted(&message);
        assert!(raw.contains("Subject: Subject line"));
        assert!(raw.contains("<digest@example.com>"));
        assert!(raw.contains("a@example.com"));
        assert!(raw.contains("b@example.com"));
        assert!(raw.contains("Content-Type: text/html; charset=utf-8"));
        assert!(raw.contains("<p>Hi</p>"));
        assert!(!raw.contains("multipart/alternative"));
    }

    #[test]
    fn test_text_alternative_message() {
        let message =
            build_message(&email_config(), "Subject", "<p>Hi</p>", Some("Hi in text")).unwrap();
        let raw = formatted(&message);
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("text/plain"));
        assert!(raw.contains("Hi in text"));
        assert!(raw.contains("<p>Hi</p>"));
    }

    #[test]
    fn test_invalid_recipient_rejected() {
        let mut config = email_config();
        config.to.push("not an address".into());
        match build_message(&config, "S", "<p>Hi</p>", None) {
            Err(SendError::Address { address, .. }) => assert_eq!(address, "not an address"),
            other => panic!("Expected Address error, got {:?}", other.map(|_| ())),
        }
    }
}
