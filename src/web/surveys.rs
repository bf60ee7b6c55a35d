use super::{form_ids, form_pairs, form_value, form_values};
use crate::error::{AppError, FieldErrors};
use crate::middleware::csrf::validate_csrf_token;
use crate::middleware::ClientCtx;
use crate::survey::{self, QuestionSpec, SurveyDraft};
use crate::user::{self, UserSummary};
use actix_web::{get, post, web, Responder};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::DatabaseConnection;
use std::borrow::Borrow;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_create_survey).service(post_create_survey);
}

#[derive(Template)]
#[template(path = "create_survey.html")]
struct CreateSurveyTemplate<'a> {
    client: ClientCtx,
    title: &'a str,
    /// Raw `questions` values, echoed back so nothing typed is lost.
    questions: Vec<String>,
    assignees: Vec<i32>,
    reviewers: Vec<i32>,
    users: Vec<UserSummary>,
    errors: FieldErrors,
}

/// Reads the creation form. Question specs that fail to parse are reported
/// under `questions`; all other checks belong to the workflow.
pub fn draft_from_form(pairs: &[(String, String)]) -> (SurveyDraft, FieldErrors) {
    let mut errors = FieldErrors::new();

    let mut questions = Vec::new();
    for (n, raw) in form_values(pairs, "questions").enumerate() {
        match QuestionSpec::parse(raw) {
            Ok(spec) => questions.push(spec),
            Err(e) => {
                log::debug!("Unreadable question {}: {}", n + 1, e);
                errors.add("questions", format!("Question {} could not be read.", n + 1));
            }
        }
    }

    let draft = SurveyDraft {
        title: form_value(pairs, "title").unwrap_or_default().trim().to_owned(),
        questions,
        assignees: form_ids(pairs, "assignees", &mut errors),
        reviewers: form_ids(pairs, "reviewers", &mut errors),
    };

    (draft, errors)
}

// Template arguments may arrive borrowed or not, hence `Borrow`.
impl<'a> CreateSurveyTemplate<'a> {
    fn is_assignee(&self, user_id: impl Borrow<i32>) -> bool {
        self.assignees.contains(user_id.borrow())
    }

    fn is_reviewer(&self, user_id: impl Borrow<i32>) -> bool {
        self.reviewers.contains(user_id.borrow())
    }

    /// Text of an echoed question for the preview list.
    fn question_text(&self, raw: &str) -> String {
        QuestionSpec::parse(raw)
            .map(|q| q.text)
            .unwrap_or_else(|_| raw.to_owned())
    }
}

#[get("/surveys/create/")]
pub async fn view_create_survey(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
) -> Result<impl Responder, AppError> {
    client.require_login()?;
    let users = user::list_users(db.get_ref()).await?;

    Ok(CreateSurveyTemplate {
        client,
        title: "",
        questions: Vec::new(),
        assignees: Vec::new(),
        reviewers: Vec::new(),
        users,
        errors: FieldErrors::new(),
    }
    .to_response())
}

#[post("/surveys/create/")]
pub async fn post_create_survey(
    client: ClientCtx,
    cookies: actix_session::Session,
    db: web::Data<DatabaseConnection>,
    body: web::Bytes,
) -> Result<impl Responder, AppError> {
    let principal = client.require_login()?;
    let pairs = form_pairs(&body);
    validate_csrf_token(&cookies, form_value(&pairs, "csrf_token").unwrap_or_default())?;

    let (draft, mut errors) = draft_from_form(&pairs);

    let result = if errors.is_empty() {
        survey::create_survey(db.get_ref(), &principal, &draft).await
    } else {
        // Collect the remaining complaints too, so the form shows them all at once.
        survey::create::validate_draft(db.get_ref(), &draft)
            .await
            .and(Err(AppError::Validation(FieldErrors::new())))
    };

    match result {
        Ok(_) => Ok(super::redirect("/profile/")),
        Err(AppError::Validation(more)) => {
            for (field, message) in more.iter() {
                errors.add(field.as_str(), message.as_str());
            }

            Ok(CreateSurveyTemplate {
                client,
                title: &draft.title,
                questions: form_values(&pairs, "questions").map(str::to_owned).collect(),
                assignees: draft.assignees.clone(),
                reviewers: draft.reviewers.clone(),
                users: user::list_users(db.get_ref()).await?,
                errors,
            }
            .to_response())
        }
        Err(e) => Err(e),
    }
}
