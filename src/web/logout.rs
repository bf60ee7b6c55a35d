use crate::middleware::ClientCtx;
use crate::session::{end_cookie_session, remove_session};
use actix_web::{get, web, Responder};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::DatabaseConnection;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_logout);
}

#[derive(Template)]
#[template(path = "logout.html")]
struct LogoutTemplate {
    client: ClientCtx,
}

#[get("/logout/")]
pub async fn view_logout(
    cookies: actix_session::Session,
    db: web::Data<DatabaseConnection>,
) -> impl Responder {
    match end_cookie_session(&cookies) {
        Some(uuid) => {
            if let Err(e) = remove_session(db.get_ref(), uuid).await {
                log::error!("view_logout: remove_session() {}", e);
            }
        }
        None => log::debug!("view_logout: missing token (already logged out?)"),
    }

    // Render as a guest, not as the user the middleware saw.
    LogoutTemplate {
        client: ClientCtx::from_session(&cookies, db.get_ref()).await,
    }
    .to_response()
}
