use super::form_pairs;
use crate::error::{AppError, FieldErrors};
use crate::middleware::csrf::validate_csrf_token;
use crate::middleware::ClientCtx;
use crate::permission::require_assignment_access;
use crate::survey::respond::{answer_field, answers_from_form};
use crate::survey::{self, AssignmentView};
use actix_web::{get, post, web, Responder};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::DatabaseConnection;
use std::borrow::Borrow;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_assignment).service(post_assignment);
}

#[derive(Template)]
#[template(path = "survey_assignment.html")]
struct AssignmentTemplate {
    client: ClientCtx,
    view: AssignmentView,
    errors: FieldErrors,
}

impl AssignmentTemplate {
    fn error_for(&self, question_id: impl Borrow<i32>) -> &str {
        self.errors.message(&answer_field(*question_id.borrow()))
    }
}

#[get("/survey-assginment/{assignment_id}/")]
pub async fn view_assignment(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<impl Responder, AppError> {
    let principal = client.require_login()?;
    let access = require_assignment_access(db.get_ref(), &principal, path.into_inner()).await?;
    let view = survey::load_assignment(db.get_ref(), &access).await?;

    Ok(AssignmentTemplate {
        client,
        view,
        errors: FieldErrors::new(),
    }
    .to_response())
}

#[post("/survey-assginment/{assignment_id}/")]
pub async fn post_assignment(
    client: ClientCtx,
    cookies: actix_session::Session,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    body: web::Bytes,
) -> Result<impl Responder, AppError> {
    let principal = client.require_login()?;
    let pairs = form_pairs(&body);
    validate_csrf_token(
        &cookies,
        super::form_value(&pairs, "csrf_token").unwrap_or_default(),
    )?;

    let access = require_assignment_access(db.get_ref(), &principal, path.into_inner()).await?;
    let answers = answers_from_form(pairs);

    match survey::submit_responses(db.get_ref(), &access, &answers).await {
        Ok(_) => Ok(super::redirect("/profile/")),
        Err(AppError::Validation(errors)) => {
            let mut view = survey::load_assignment(db.get_ref(), &access).await?;
            // Keep what was picked so the form comes back filled in.
            for question in view.questions.iter_mut() {
                if question.selected.is_none() {
                    question.selected = answers.get(&question.id).copied();
                }
            }

            Ok(AssignmentTemplate {
                client,
                view,
                errors,
            }
            .to_response())
        }
        Err(e) => Err(e),
    }
}
