use super::{EmailError, EmailResult};
use crate::app_config::EmailConfig;
use lettre::message::{header::ContentType, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

fn mailbox(name: Option<&str>, address: &str) -> EmailResult<Mailbox> {
    let raw = match name {
        Some(name) if !name.is_empty() => format!("{} <{}>", name, address),
        _ => address.to_owned(),
    };
    raw.parse()
        .map_err(|e| EmailError::ConfigError(format!("Invalid address {:?}: {}", address, e)))
}

fn build_message(
    config: &EmailConfig,
    to: &str,
    subject: &str,
    body_text: &str,
    body_html: Option<&str>,
) -> EmailResult<Message> {
    let builder = Message::builder()
        .from(mailbox(Some(&config.from_name), &config.from_address)?)
        .to(mailbox(None, to)?)
        .subject(subject);

    let message = match body_html {
        Some(html) => builder.multipart(
            MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(body_text.to_owned()),
                )
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(html.to_owned()),
                ),
        )?,
        None => builder
            .header(ContentType::TEXT_PLAIN)
            .body(body_text.to_owned())?,
    };

    Ok(message)
}

fn transport(config: &EmailConfig) -> EmailResult<SmtpTransport> {
    let builder = if config.smtp_tls {
        SmtpTransport::relay(&config.smtp_host)?
    } else {
        SmtpTransport::builder_dangerous(&config.smtp_host)
    };

    let builder = if config.smtp_username.is_empty() {
        builder
    } else {
        builder.credentials(Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.clone(),
        ))
    };

    Ok(builder.port(config.smtp_port).build())
}

pub async fn send_email(
    config: &EmailConfig,
    to: &str,
    subject: &str,
    body_text: &str,
    body_html: Option<&str>,
) -> EmailResult<()> {
    let message = build_message(config, to, subject, body_text, body_html)?;
    transport(config)?.send(&message)?;

    log::info!("Email sent to {}", to);
    Ok(())
}
