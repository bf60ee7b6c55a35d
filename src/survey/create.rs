//! Survey authoring and participant management.

use crate::error::{AppError, FieldErrors};
use crate::orm::{choices, questions, survey_assignments, surveys};
use crate::permission::{self, Permission, SurveyOwnership};
use crate::user::{self, Principal};
use chrono::Utc;
use sea_orm::{entity::*, query::*, ConnectionTrait, DatabaseConnection, DbErr, TransactionTrait};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ChoiceSpec {
    pub text: String,
}

/// One question of a draft with its choices in display order.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct QuestionSpec {
    pub text: String,
    #[serde(default)]
    pub choices: Vec<ChoiceSpec>,
}

impl QuestionSpec {
    pub fn new(text: &str, choices: &[&str]) -> Self {
        Self {
            text: text.to_owned(),
            choices: choices
                .iter()
                .map(|c| ChoiceSpec {
                    text: (*c).to_owned(),
                })
                .collect(),
        }
    }

    /// Parses one `questions` form value, e.g.
    /// `{"text": "Lunch?", "choices": [{"text": "Pizza"}, {"text": "Soup"}]}`.
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[derive(Clone, Debug, Default, Validate)]
pub struct SurveyDraft {
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "questions are required"))]
    pub questions: Vec<QuestionSpec>,
    #[validate(length(min = 1, message = "assignees are required"))]
    pub assignees: Vec<i32>,
    pub reviewers: Vec<i32>,
}

/// Users to add to an existing survey.
#[derive(Clone, Debug, Default)]
pub struct Participants {
    pub assignees: Vec<i32>,
    pub reviewers: Vec<i32>,
}

/// Collapses duplicate ids, keeping first-seen order.
fn distinct(ids: &[i32]) -> Vec<i32> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(id) {
            out.push(*id);
        }
    }
    out
}

async fn check_users_exist<C>(
    db: &C,
    errors: &mut FieldErrors,
    field: &str,
    ids: &[i32],
) -> Result<(), DbErr>
where
    C: ConnectionTrait,
{
    let unknown = user::unknown_user_ids(db, ids).await?;
    if let Some(id) = unknown.first() {
        errors.add(field, format!("There is no user with id {}.", id));
    }
    Ok(())
}

/// Checks a draft without writing anything.
pub async fn validate_draft(db: &DatabaseConnection, draft: &SurveyDraft) -> Result<(), AppError> {
    let mut errors = match draft.validate() {
        Ok(()) => FieldErrors::new(),
        Err(e) => FieldErrors::from(e),
    };

    if !draft.title.is_empty() && draft.title.trim().is_empty() {
        errors.add("title", "title is required");
    }

    for (n, question) in draft.questions.iter().enumerate() {
        if question.text.trim().is_empty() {
            errors.add("questions", format!("Question {} has no text.", n + 1));
        } else if question.choices.is_empty() {
            errors.add("questions", format!("Question {} has no choices.", n + 1));
        } else if question.choices.iter().any(|c| c.text.trim().is_empty()) {
            errors.add("questions", format!("Question {} has an empty choice.", n + 1));
        }
    }

    check_users_exist(db, &mut errors, "assignees", &draft.assignees).await?;
    check_users_exist(db, &mut errors, "reviewers", &draft.reviewers).await?;

    errors.into_result()
}

/// Creates an assignment for every assignee that lacks one for this survey and
/// grants them access to it. Returns the assignments created.
async fn assign_users<C>(
    db: &C,
    survey_id: i32,
    assigned_by: i32,
    assignees: &[i32],
) -> Result<Vec<survey_assignments::Model>, DbErr>
where
    C: ConnectionTrait,
{
    let now = Utc::now().naive_utc();
    let mut created = Vec::new();

    for assignee in distinct(assignees) {
        let existing = survey_assignments::Entity::find()
            .filter(survey_assignments::Column::SurveyId.eq(survey_id))
            .filter(survey_assignments::Column::AssignedTo.eq(assignee))
            .one(db)
            .await?;

        if let Some(existing) = existing {
            permission::grant_user(db, assignee, Permission::ViewAssignment, existing.id).await?;
            continue;
        }

        let assignment = survey_assignments::ActiveModel {
            survey_id: Set(Some(survey_id)),
            assigned_by: Set(Some(assigned_by)),
            assigned_to: Set(Some(assignee)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;

        permission::grant_user(db, assignee, Permission::ViewAssignment, assignment.id).await?;
        created.push(assignment);
    }

    Ok(created)
}

/// Puts the users in the survey's results group. Returns how many joined.
async fn add_result_viewers<C>(db: &C, survey_id: i32, members: &[i32]) -> Result<usize, DbErr>
where
    C: ConnectionTrait,
{
    let group = permission::ensure_group(db, &permission::results_group_name(survey_id)).await?;
    permission::grant_group(db, group.id, Permission::ViewResults, survey_id).await?;

    let mut added = 0;
    for member in distinct(members) {
        if permission::add_member(db, group.id, member).await? {
            added += 1;
        }
    }
    Ok(added)
}

/// Creates a survey with its questions and choices, assigns it and sets up
/// the results group, all in one transaction. Returns the new survey's id.
pub async fn create_survey(
    db: &DatabaseConnection,
    principal: &Principal,
    draft: &SurveyDraft,
) -> Result<i32, AppError> {
    validate_draft(db, draft).await?;

    let now = Utc::now().naive_utc();
    let txn = db.begin().await?;

    let survey = surveys::ActiveModel {
        title: Set(draft.title.trim().to_owned()),
        created_by: Set(Some(principal.id)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    for spec in &draft.questions {
        let question = questions::ActiveModel {
            text: Set(spec.text.trim().to_owned()),
            survey_id: Set(Some(survey.id)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        for choice in &spec.choices {
            choices::ActiveModel {
                text: Set(choice.text.trim().to_owned()),
                question_id: Set(Some(question.id)),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }
    }

    let assignments = assign_users(&txn, survey.id, principal.id, &draft.assignees).await?;

    let mut viewers = vec![principal.id];
    viewers.extend_from_slice(&draft.reviewers);
    add_result_viewers(&txn, survey.id, &viewers).await?;

    txn.commit().await?;

    log::info!(
        "User {} created survey {} with {} questions and {} assignments",
        principal.id,
        survey.id,
        draft.questions.len(),
        assignments.len()
    );

    Ok(survey.id)
}

/// Assigns an existing survey to more users and adds result viewers.
///
/// Assignees who already hold an assignment for the survey are skipped.
/// Returns the number of assignments created.
pub async fn add_participants(
    db: &DatabaseConnection,
    ownership: &SurveyOwnership,
    principal: &Principal,
    participants: &Participants,
) -> Result<usize, AppError> {
    let mut errors = FieldErrors::new();
    if participants.assignees.is_empty() && participants.reviewers.is_empty() {
        errors.add("assignees", "Choose at least one assignee or reviewer.");
    }
    check_users_exist(db, &mut errors, "assignees", &participants.assignees).await?;
    check_users_exist(db, &mut errors, "reviewers", &participants.reviewers).await?;
    errors.into_result()?;

    let survey_id = ownership.survey().id;
    let txn = db.begin().await?;

    let assignments = assign_users(&txn, survey_id, principal.id, &participants.assignees).await?;
    let viewers = if participants.reviewers.is_empty() {
        0
    } else {
        add_result_viewers(&txn, survey_id, &participants.reviewers).await?
    };

    txn.commit().await?;

    log::info!(
        "User {} added {} assignments and {} result viewers to survey {}",
        principal.id,
        assignments.len(),
        viewers,
        survey_id
    );

    Ok(assignments.len())
}
