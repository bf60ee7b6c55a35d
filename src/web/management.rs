use super::{form_ids, form_pairs, form_value};
use crate::error::{AppError, FieldErrors};
use crate::middleware::csrf::validate_csrf_token;
use crate::middleware::ClientCtx;
use crate::orm::surveys;
use crate::permission::{require_survey_owner, SurveyOwnership};
use crate::survey::{self, listing, AssigneeStatus, Participants};
use crate::user::{self, UserSummary};
use actix_web::{get, post, web, Responder};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::DatabaseConnection;
use std::borrow::Borrow;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_management).service(post_management);
}

#[derive(Template)]
#[template(path = "survey_management.html")]
struct ManagementTemplate {
    client: ClientCtx,
    survey: surveys::Model,
    assignees: Vec<AssigneeStatus>,
    viewers: Vec<UserSummary>,
    users: Vec<UserSummary>,
    /// Assignments created by the last submission.
    added: Option<usize>,
    errors: FieldErrors,
}

impl ManagementTemplate {
    async fn load(
        client: ClientCtx,
        db: &DatabaseConnection,
        ownership: &SurveyOwnership,
        added: Option<usize>,
        errors: FieldErrors,
    ) -> Result<Self, AppError> {
        let survey = ownership.survey().clone();
        Ok(Self {
            client,
            assignees: listing::survey_assignees(db, survey.id).await?,
            viewers: listing::survey_result_viewers(db, survey.id).await?,
            users: user::list_users(db).await?,
            survey,
            added,
            errors,
        })
    }

    fn is_assigned(&self, user_id: impl Borrow<i32>) -> bool {
        let user_id = *user_id.borrow();
        self.assignees.iter().any(|a| a.user.id == user_id)
    }

    fn is_viewer(&self, user_id: impl Borrow<i32>) -> bool {
        let user_id = *user_id.borrow();
        self.viewers.iter().any(|v| v.id == user_id)
    }
}

#[get("/survey-management/{survey_id}/")]
pub async fn view_management(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<impl Responder, AppError> {
    let principal = client.require_login()?;
    let ownership = require_survey_owner(db.get_ref(), &principal, path.into_inner()).await?;

    Ok(
        ManagementTemplate::load(client, db.get_ref(), &ownership, None, FieldErrors::new())
            .await?
            .to_response(),
    )
}

#[post("/survey-management/{survey_id}/")]
pub async fn post_management(
    client: ClientCtx,
    cookies: actix_session::Session,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    body: web::Bytes,
) -> Result<impl Responder, AppError> {
    let principal = client.require_login()?;
    let pairs = form_pairs(&body);
    validate_csrf_token(&cookies, form_value(&pairs, "csrf_token").unwrap_or_default())?;

    let ownership = require_survey_owner(db.get_ref(), &principal, path.into_inner()).await?;

    let mut errors = FieldErrors::new();
    let participants = Participants {
        assignees: form_ids(&pairs, "assignees", &mut errors),
        reviewers: form_ids(&pairs, "reviewers", &mut errors),
    };

    let result = if errors.is_empty() {
        survey::add_participants(db.get_ref(), &ownership, &principal, &participants).await
    } else {
        Err(AppError::Validation(errors))
    };

    let (added, errors) = match result {
        Ok(added) => (Some(added), FieldErrors::new()),
        Err(AppError::Validation(errors)) => (None, errors),
        Err(e) => return Err(e),
    };

    Ok(
        ManagementTemplate::load(client, db.get_ref(), &ownership, added, errors)
            .await?
            .to_response(),
    )
}
