//! Password reset by emailed link.
//!
//! Reset tokens hash the current password, so a link stops working as soon as
//! it has been used.

use crate::app_config;
use crate::email;
use crate::error::{AppError, FieldErrors};
use crate::middleware::csrf::validate_csrf_token;
use crate::middleware::ClientCtx;
use crate::orm::users;
use crate::session;
use crate::token::AccountTokens;
use crate::user;
use actix_web::{get, post, web, Responder};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::{entity::*, ConnectionTrait, DatabaseConnection, DbErr};
use serde::Deserialize;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_request_reset)
        .service(post_request_reset)
        .service(view_confirm_reset)
        .service(post_confirm_reset);
}

#[derive(Template)]
#[template(path = "password_reset_request.html")]
struct PasswordResetRequestTemplate {
    client: ClientCtx,
    sent: bool,
}

#[derive(Template)]
#[template(path = "password_reset_confirm.html")]
struct PasswordResetConfirmTemplate {
    client: ClientCtx,
    /// False when the link is unknown, expired or used.
    valid_link: bool,
    min_password_length: u32,
    errors: FieldErrors,
}

#[derive(Deserialize)]
pub struct PasswordResetRequestForm {
    email: String,
    csrf_token: String,
}

#[derive(Deserialize)]
pub struct PasswordResetConfirmForm {
    pub password: String,
    pub password_confirm: String,
    #[serde(default)]
    pub csrf_token: String,
}

/// Emails a reset link if an active account uses this address.
/// Returns whether a link was sent.
pub async fn request_reset<C>(db: &C, tokens: &AccountTokens, address: &str) -> Result<bool, DbErr>
where
    C: ConnectionTrait,
{
    let user = match user::find_by_email(db, address.trim()).await? {
        Some(user) if user.is_active => user,
        _ => {
            log::debug!("Password reset requested for unknown or inactive address");
            return Ok(false);
        }
    };

    let link = email::templates::password_reset_link(
        &app_config::site().base_url,
        user.id,
        &tokens.reset.make_token(&user),
    );

    if let Err(e) = email::send_password_reset_email(
        &user.email,
        &user.username,
        &link,
        app_config::security().token_expiry_hours,
    )
    .await
    {
        log::error!("Failed to send password reset email to user {}: {}", user.id, e);
        return Ok(false);
    }

    log::info!("Password reset requested for user {}", user.id);
    Ok(true)
}

/// The user a reset link belongs to, if the link is still good.
pub async fn check_reset_link<C>(
    db: &C,
    tokens: &AccountTokens,
    user_id: i32,
    token: &str,
) -> Result<Option<users::Model>, DbErr>
where
    C: ConnectionTrait,
{
    Ok(users::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .filter(|user| user.is_active && tokens.reset.check_token(user, token)))
}

/// Sets a new password through a reset link and ends the user's existing
/// sessions. Returns None when the link is not valid.
pub async fn reset_password<C>(
    db: &C,
    tokens: &AccountTokens,
    user_id: i32,
    token: &str,
    form: &PasswordResetConfirmForm,
    min_password_length: u32,
) -> Result<Option<users::Model>, AppError>
where
    C: ConnectionTrait,
{
    let user = match check_reset_link(db, tokens, user_id, token).await? {
        Some(user) => user,
        None => return Ok(None),
    };

    let mut errors = FieldErrors::new();
    super::register::validate_new_password(
        &mut errors,
        &form.password,
        &form.password_confirm,
        min_password_length,
    );
    errors.into_result()?;

    let password = session::hash_password(&form.password)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

    let mut active: users::ActiveModel = user.into();
    active.password = Set(password);
    let user = active.update(db).await?;

    // Sessions opened with the old password must not survive the reset.
    let ended = session::invalidate_user_sessions(db, user.id).await?;

    log::info!(
        "User {} reset their password, ending {} sessions",
        user.id,
        ended
    );
    Ok(Some(user))
}

#[get("/reset-password/")]
pub async fn view_request_reset(client: ClientCtx) -> impl Responder {
    PasswordResetRequestTemplate {
        client,
        sent: false,
    }
    .to_response()
}

#[post("/reset-password/")]
pub async fn post_request_reset(
    client: ClientCtx,
    cookies: actix_session::Session,
    db: web::Data<DatabaseConnection>,
    tokens: web::Data<AccountTokens>,
    form: web::Form<PasswordResetRequestForm>,
) -> Result<impl Responder, AppError> {
    validate_csrf_token(&cookies, &form.csrf_token)?;

    // Same answer either way, so the form cannot be used to probe for accounts.
    request_reset(db.get_ref(), &tokens, &form.email).await?;

    Ok(PasswordResetRequestTemplate { client, sent: true }.to_response())
}

#[get("/reset-password-confirmation/{user_id}/{token}/")]
pub async fn view_confirm_reset(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    tokens: web::Data<AccountTokens>,
    path: web::Path<(i32, String)>,
) -> Result<impl Responder, AppError> {
    let (user_id, token) = path.into_inner();
    let valid_link = check_reset_link(db.get_ref(), &tokens, user_id, &token)
        .await?
        .is_some();

    Ok(PasswordResetConfirmTemplate {
        client,
        valid_link,
        min_password_length: app_config::security().min_password_length,
        errors: FieldErrors::new(),
    }
    .to_response())
}

#[post("/reset-password-confirmation/{user_id}/{token}/")]
pub async fn post_confirm_reset(
    client: ClientCtx,
    cookies: actix_session::Session,
    db: web::Data<DatabaseConnection>,
    tokens: web::Data<AccountTokens>,
    path: web::Path<(i32, String)>,
    form: web::Form<PasswordResetConfirmForm>,
) -> Result<impl Responder, AppError> {
    validate_csrf_token(&cookies, &form.csrf_token)?;

    let (user_id, token) = path.into_inner();
    let security = app_config::security();

    let user = match reset_password(
        db.get_ref(),
        &tokens,
        user_id,
        &token,
        &form,
        security.min_password_length,
    )
    .await
    {
        Ok(Some(user)) => user,
        Ok(None) => {
            return Ok(PasswordResetConfirmTemplate {
                client,
                valid_link: false,
                min_password_length: security.min_password_length,
                errors: FieldErrors::new(),
            }
            .to_response());
        }
        Err(AppError::Validation(errors)) => {
            return Ok(PasswordResetConfirmTemplate {
                client,
                valid_link: true,
                min_password_length: security.min_password_length,
                errors,
            }
            .to_response());
        }
        Err(e) => return Err(e),
    };

    super::login::start_login(db.get_ref(), &cookies, user.id).await?;

    Ok(super::redirect("/profile/"))
}
