use crate::app_config;
use crate::error::AppError;
use crate::middleware::csrf::validate_csrf_token;
use crate::middleware::ClientCtx;
use crate::orm::users;
use crate::session;
use crate::user;
use actix_web::{get, post, web, Responder};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr};
use serde::Deserialize;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(post_login).service(view_login);
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate<'a> {
    pub client: ClientCtx,
    pub username: &'a str,
    /// Username or password did not match.
    pub invalid_creds: bool,
    /// The account has not confirmed its email address yet.
    pub inactive: bool,
}

#[derive(Deserialize)]
pub struct FormData {
    username: String,
    password: String,
    csrf_token: String,
}

#[derive(Debug)]
pub enum LoginResult {
    Success(users::Model),
    BadName,
    BadPassword,
    Inactive,
}

/// Checks a username and password pair.
pub async fn login<C>(db: &C, name: &str, pass: &str) -> Result<LoginResult, DbErr>
where
    C: ConnectionTrait,
{
    let user = match user::find_by_username(db, name.trim()).await? {
        Some(user) => user,
        None => return Ok(LoginResult::BadName),
    };

    if !session::verify_password(&user.password, pass) {
        return Ok(LoginResult::BadPassword);
    }

    // Only checked after the password so the message cannot probe for accounts.
    if !user.is_active {
        return Ok(LoginResult::Inactive);
    }

    Ok(LoginResult::Success(user))
}

/// Opens a session for the user and stores it in the cookie.
pub(super) async fn start_login(
    db: &DatabaseConnection,
    cookies: &actix_session::Session,
    user_id: i32,
) -> Result<(), AppError> {
    let ttl = chrono::Duration::minutes(app_config::security().session_timeout_minutes.into());
    let uuid = session::new_session(db, user_id, ttl).await?;
    session::start_cookie_session(cookies, uuid)
        .map_err(|e| AppError::Internal(format!("Unable to store session cookie: {}", e)))
}

#[post("/login/")]
pub async fn post_login(
    client: ClientCtx,
    cookies: actix_session::Session,
    db: web::Data<DatabaseConnection>,
    form: web::Form<FormData>,
) -> Result<impl Responder, AppError> {
    validate_csrf_token(&cookies, &form.csrf_token)?;

    let user = match login(db.get_ref(), &form.username, &form.password).await? {
        LoginResult::Success(user) => user,
        LoginResult::Inactive => {
            log::debug!("login refused: {} has not confirmed their email", form.username);
            return Ok(LoginTemplate {
                client,
                username: &form.username,
                invalid_creds: false,
                inactive: true,
            }
            .to_response());
        }
        result @ (LoginResult::BadName | LoginResult::BadPassword) => {
            log::debug!("login failure: {:?} for {}", result, form.username);
            return Ok(LoginTemplate {
                client,
                username: &form.username,
                invalid_creds: true,
                inactive: false,
            }
            .to_response());
        }
    };

    start_login(db.get_ref(), &cookies, user.id).await?;
    log::info!("User {} logged in", user.id);
    Ok(super::redirect("/profile/"))
}

#[get("/login/")]
pub async fn view_login(client: ClientCtx) -> impl Responder {
    if client.is_user() {
        return super::redirect("/profile/");
    }

    LoginTemplate {
        client,
        username: "",
        invalid_creds: false,
        inactive: false,
    }
    .to_response()
}
