use crate::error::AppError;
use crate::middleware::ClientCtx;
use crate::orm::surveys;
use crate::permission::require_results_access;
use crate::survey::{self, QuestionTally};
use actix_web::{get, web, Responder};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::DatabaseConnection;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_results);
}

#[derive(Template)]
#[template(path = "survey_results.html")]
struct ResultsTemplate {
    client: ClientCtx,
    survey: surveys::Model,
    questions: Vec<QuestionTally>,
}

#[get("/survey-results/{survey_id}/")]
pub async fn view_results(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<impl Responder, AppError> {
    let principal = client.require_login()?;
    let access = require_results_access(db.get_ref(), &principal, path.into_inner()).await?;
    let questions = survey::aggregate_results(db.get_ref(), &access).await?;

    Ok(ResultsTemplate {
        client,
        survey: access.survey().clone(),
        questions,
    }
    .to_response())
}
