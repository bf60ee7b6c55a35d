//! Account emails. Bodies are askama templates under `templates/email/`.

use super::{send_email, EmailResult};
use askama::Template;

#[derive(Template)]
#[template(path = "email/confirm_email.txt")]
struct ConfirmEmailText<'a> {
    site_name: &'a str,
    username: &'a str,
    link: &'a str,
    expiry_hours: u32,
}

#[derive(Template)]
#[template(path = "email/confirm_email.html")]
struct ConfirmEmailHtml<'a> {
    site_name: &'a str,
    username: &'a str,
    link: &'a str,
    expiry_hours: u32,
}

#[derive(Template)]
#[template(path = "email/password_reset.txt")]
struct PasswordResetText<'a> {
    site_name: &'a str,
    username: &'a str,
    link: &'a str,
    expiry_hours: u32,
}

#[derive(Template)]
#[template(path = "email/password_reset.html")]
struct PasswordResetHtml<'a> {
    site_name: &'a str,
    username: &'a str,
    link: &'a str,
    expiry_hours: u32,
}

/// `<base_url>/confirm-email/<user_id>/<token>/`
pub fn confirmation_link(base_url: &str, user_id: i32, token: &str) -> String {
    format!(
        "{}/confirm-email/{}/{}/",
        base_url.trim_end_matches('/'),
        user_id,
        token
    )
}

/// `<base_url>/reset-password-confirmation/<user_id>/<token>/`
pub fn password_reset_link(base_url: &str, user_id: i32, token: &str) -> String {
    format!(
        "{}/reset-password-confirmation/{}/{}/",
        base_url.trim_end_matches('/'),
        user_id,
        token
    )
}

pub async fn send_confirmation_email(
    to: &str,
    username: &str,
    link: &str,
    expiry_hours: u32,
) -> EmailResult<()> {
    let site = crate::app_config::site();

    let text = ConfirmEmailText {
        site_name: &site.name,
        username,
        link,
        expiry_hours,
    }
    .render()?;
    let html = ConfirmEmailHtml {
        site_name: &site.name,
        username,
        link,
        expiry_hours,
    }
    .render()?;

    let subject = format!("Confirm your {} account", site.name);
    send_email(to, &subject, &text, Some(&html)).await
}

pub async fn send_password_reset_email(
    to: &str,
    username: &str,
    link: &str,
    expiry_hours: u32,
) -> EmailResult<()> {
    let site = crate::app_config::site();

    let text = PasswordResetText {
        site_name: &site.name,
        username,
        link,
        expiry_hours,
    }
    .render()?;
    let html = PasswordResetHtml {
        site_name: &site.name,
        username,
        link,
        expiry_hours,
    }
    .render()?;

    let subject = format!("Reset your {} password", site.name);
    send_email(to, &subject, &text, Some(&html)).await
}
