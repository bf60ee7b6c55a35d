//! Outgoing email.
//!
//! Messages go out over SMTP with lettre. With `email.mock` set (the default)
//! they are only written to the log, which is what development and the test
//! suite rely on.

pub mod smtp;
pub mod templates;

pub use templates::{send_confirmation_email, send_password_reset_email};

use crate::app_config;

pub type EmailResult<T> = Result<T, EmailError>;

#[derive(Debug)]
pub enum EmailError {
    /// Bad address or transport settings
    ConfigError(String),
    BuildError(lettre::error::Error),
    SendError(lettre::transport::smtp::Error),
    /// Body template failed to render
    RenderError(askama::Error),
}

impl std::fmt::Display for EmailError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmailError::ConfigError(msg) => write!(f, "Email config error: {}", msg),
            EmailError::BuildError(e) => write!(f, "Email build error: {}", e),
            EmailError::SendError(e) => write!(f, "Email send error: {}", e),
            EmailError::RenderError(e) => write!(f, "Email render error: {}", e),
        }
    }
}

impl std::error::Error for EmailError {}

impl From<lettre::error::Error> for EmailError {
    fn from(e: lettre::error::Error) -> Self {
        EmailError::BuildError(e)
    }
}

impl From<lettre::transport::smtp::Error> for EmailError {
    fn from(e: lettre::transport::smtp::Error) -> Self {
        EmailError::SendError(e)
    }
}

impl From<askama::Error> for EmailError {
    fn from(e: askama::Error) -> Self {
        EmailError::RenderError(e)
    }
}

/// Sends a message with a plain text body and an optional HTML alternative.
pub async fn send_email(
    to: &str,
    subject: &str,
    body_text: &str,
    body_html: Option<&str>,
) -> EmailResult<()> {
    let config = app_config::email();

    if config.mock {
        log::info!("MOCK EMAIL:");
        log::info!("  To: {}", to);
        log::info!("  Subject: {}", subject);
        log::info!("  Body: {}", body_text);
        return Ok(());
    }

    smtp::send_email(&config, to, subject, body_text, body_html).await
}
