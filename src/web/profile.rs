use crate::error::AppError;
use crate::middleware::ClientCtx;
use crate::survey::{self, Profile};
use crate::user::Principal;
use actix_web::{get, web, Responder};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::DatabaseConnection;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_profile);
}

#[derive(Template)]
#[template(path = "profile.html")]
struct ProfileTemplate {
    client: ClientCtx,
    principal: Principal,
    profile: Profile,
}

#[get("/profile/")]
pub async fn view_profile(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
) -> Result<impl Responder, AppError> {
    let principal = client.require_login()?;
    let profile = survey::load_profile(db.get_ref(), &principal).await?;

    Ok(ProfileTemplate {
        client,
        principal,
        profile,
    }
    .to_response())
}
