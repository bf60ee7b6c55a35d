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
use chrono::Utc;
use sea_orm::{entity::*, ConnectionTrait, DatabaseConnection, DbErr};
use serde::Deserialize;
use validator::Validate;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_register)
        .service(post_register)
        .service(view_confirm_email);
}

#[derive(Template)]
#[template(path = "register.html")]
struct RegisterTemplate<'a> {
    client: ClientCtx,
    username: &'a str,
    email: &'a str,
    min_password_length: u32,
    errors: FieldErrors,
}

#[derive(Template)]
#[template(path = "register_done.html")]
struct RegisterDoneTemplate<'a> {
    client: ClientCtx,
    email: &'a str,
}

#[derive(Template)]
#[template(path = "confirm_email.html")]
struct ConfirmEmailTemplate {
    client: ClientCtx,
    confirmed: bool,
}

#[derive(Clone, Debug, Default, Deserialize, Validate)]
pub struct RegisterForm {
    #[validate(length(min = 1, max = 150, message = "Usernames are 1 to 150 characters long."))]
    pub username: String,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    #[serde(default)]
    pub csrf_token: String,
}

/// Letters, digits and `@ . + - _`.
fn is_valid_username(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}

fn validate_registration(form: &RegisterForm, min_password_length: u32) -> FieldErrors {
    let mut errors = match form.validate() {
        Ok(()) => FieldErrors::new(),
        Err(e) => FieldErrors::from(e),
    };

    if !is_valid_username(&form.username) {
        errors.add(
            "username",
            "Usernames may only contain letters, digits and @ . + - _",
        );
    }

    validate_new_password(
        &mut errors,
        &form.password,
        &form.password_confirm,
        min_password_length,
    );

    errors
}

/// Length and confirmation checks shared by registration and password reset.
pub(super) fn validate_new_password(
    errors: &mut FieldErrors,
    password: &str,
    confirm: &str,
    min_password_length: u32,
) {
    if password.chars().count() < min_password_length as usize {
        errors.add(
            "password",
            format!(
                "Passwords must be at least {} characters long.",
                min_password_length
            ),
        );
    }

    if password != confirm {
        errors.add("password_confirm", "The two passwords do not match.");
    }
}

/// Creates an inactive account. It becomes usable once its email is confirmed.
pub async fn register_user<C>(
    db: &C,
    form: &RegisterForm,
    min_password_length: u32,
) -> Result<users::Model, AppError>
where
    C: ConnectionTrait,
{
    let form = RegisterForm {
        username: form.username.trim().to_owned(),
        email: form.email.trim().to_owned(),
        ..form.clone()
    };

    let mut errors = validate_registration(&form, min_password_length);

    if user::find_by_username(db, &form.username).await?.is_some() {
        errors.add("username", "That username is taken.");
    }
    if user::find_by_email(db, &form.email).await?.is_some() {
        errors.add("email", "An account with that email address already exists.");
    }

    errors.into_result()?;

    let password = session::hash_password(&form.password)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

    let user = users::ActiveModel {
        username: Set(form.username),
        email: Set(form.email),
        password: Set(password),
        is_active: Set(false),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    log::info!("Registered user {} ({})", user.id, user.username);
    Ok(user)
}

/// Activates the account if the token is valid. Returns None for an unknown
/// user or a bad, expired or already used token.
pub async fn confirm_email<C>(
    db: &C,
    tokens: &AccountTokens,
    user_id: i32,
    token: &str,
) -> Result<Option<users::Model>, DbErr>
where
    C: ConnectionTrait,
{
    let user = match users::Entity::find_by_id(user_id).one(db).await? {
        Some(user) => user,
        None => return Ok(None),
    };

    if !tokens.confirm.check_token(&user, token) {
        log::debug!("Rejected confirmation token for user {}", user_id);
        return Ok(None);
    }

    let mut active: users::ActiveModel = user.into();
    active.is_active = Set(true);
    let user = active.update(db).await?;

    log::info!("User {} confirmed their email", user.id);
    Ok(Some(user))
}

#[get("/register/")]
pub async fn view_register(client: ClientCtx) -> impl Responder {
    if client.is_user() {
        return super::redirect("/profile/");
    }

    RegisterTemplate {
        client,
        username: "",
        email: "",
        min_password_length: app_config::security().min_password_length,
        errors: FieldErrors::new(),
    }
    .to_response()
}

#[post("/register/")]
pub async fn post_register(
    client: ClientCtx,
    cookies: actix_session::Session,
    db: web::Data<DatabaseConnection>,
    tokens: web::Data<AccountTokens>,
    form: web::Form<RegisterForm>,
) -> Result<impl Responder, AppError> {
    validate_csrf_token(&cookies, &form.csrf_token)?;

    let security = app_config::security();
    let user = match register_user(db.get_ref(), &form, security.min_password_length).await {
        Ok(user) => user,
        Err(AppError::Validation(errors)) => {
            return Ok(RegisterTemplate {
                client,
                username: &form.username,
                email: &form.email,
                min_password_length: security.min_password_length,
                errors,
            }
            .to_response());
        }
        Err(e) => return Err(e),
    };

    let link = email::templates::confirmation_link(
        &app_config::site().base_url,
        user.id,
        &tokens.confirm.make_token(&user),
    );
    if let Err(e) =
        email::send_confirmation_email(&user.email, &user.username, &link, security.token_expiry_hours)
            .await
    {
        log::error!("Failed to send confirmation email to user {}: {}", user.id, e);
    }

    Ok(RegisterDoneTemplate {
        client,
        email: &user.email,
    }
    .to_response())
}

#[get("/confirm-email/{user_id}/{token}/")]
pub async fn view_confirm_email(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    tokens: web::Data<AccountTokens>,
    path: web::Path<(i32, String)>,
) -> Result<impl Responder, AppError> {
    let (user_id, token) = path.into_inner();
    let confirmed = confirm_email(db.get_ref(), &tokens, user_id, &token)
        .await?
        .is_some();

    Ok(ConfirmEmailTemplate { client, confirmed }.to_response())
}
