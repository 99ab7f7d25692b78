//! Email delivery.
//!
//! [`Mailer`] is the seam the dispatcher sends through. [`SmtpMailer`] wraps
//! the `lettre` async SMTP transport and sends the HTML body built by
//! [`EmailMessage::html_body`]. When `SMTP_HOST` is not set,
//! [`EmailConfig::from_env`] returns `None` and [`LogMailer`] is used instead.

use async_trait::async_trait;
use buildtrack_core::email::EmailMessage;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

// ---------------------------------------------------------------------------
// Mailer
// ---------------------------------------------------------------------------

/// Sends a single transactional email.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError>;
}

/// Mailer used when SMTP is not configured: logs the message and succeeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            "SMTP not configured, email logged instead of sent"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `SMTP_FROM` is not set.
const DEFAULT_FROM_ADDRESS: &str = "BuildTrack <noreply@buildtrack.local>";

/// Configuration for SMTP delivery.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `SMTP_HOST` is not set.
    ///
    /// | Variable        | Required | Default                                  |
    /// |-----------------|----------|------------------------------------------|
    /// | `SMTP_HOST`     | yes      |                                          |
    /// | `SMTP_PORT`     | no       | `587`                                    |
    /// | `SMTP_FROM`     | no       | `BuildTrack <noreply@buildtrack.local>`  |
    /// | `SMTP_USER`     | no       |                                          |
    /// | `SMTP_PASSWORD` | no       |                                          |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok()?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

// ---------------------------------------------------------------------------
// SmtpMailer
// ---------------------------------------------------------------------------

/// Sends emails through an SMTP relay.
pub struct SmtpMailer {
    config: EmailConfig,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Build the mailer and its pooled SMTP transport.
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port);

        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            config,
        })
    }
}

/// Assemble the MIME message for an email.
pub fn build_message(from: &str, message: &EmailMessage) -> Result<Message, EmailError> {
    Message::builder()
        .from(from.parse()?)
        .to(message.to.parse()?)
        .subject(message.subject.clone())
        .header(ContentType::TEXT_HTML)
        .body(message.html_body())
        .map_err(|e| EmailError::Build(e.to_string()))
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        let email = build_message(&self.config.from_address, message)?;
        self.transport.send(email).await?;
        tracing::info!(to = %message.to, subject = %message.subject, "Email sent");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
