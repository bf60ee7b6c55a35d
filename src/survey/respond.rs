//! Answering an assigned survey.
//!
//! A submission is all or nothing: every question of the survey needs an
//! answer, every answer must name a choice of its own question, and the
//! responses are written in one transaction.

use super::{choices_for_questions, questions_for_survey};
use crate::db;
use crate::error::{AppError, FieldErrors};
use crate::orm::{choices, survey_responses};
use crate::permission::AssignmentAccess;
use chrono::Utc;
use sea_orm::{entity::*, query::*, ConnectionTrait, DatabaseConnection, TransactionTrait};
use std::borrow::Borrow;
use std::collections::HashMap;

/// Question id to chosen choice id.
pub type Answers = HashMap<i32, i32>;

const ANSWER_PREFIX: &str = "question_";

/// Form field carrying the answer to a question.
pub fn answer_field(question_id: i32) -> String {
    format!("{}{}", ANSWER_PREFIX, question_id)
}

/// Collects `question_<id>=<choice id>` pairs. Other fields and values that
/// are not ids are ignored, which leaves those questions unanswered.
pub fn answers_from_form<K, V, I>(pairs: I) -> Answers
where
    K: AsRef<str>,
    V: AsRef<str>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .filter_map(|(key, value)| {
            let question_id = key.as_ref().strip_prefix(ANSWER_PREFIX)?.parse().ok()?;
            let choice_id = value.as_ref().trim().parse().ok()?;
            Some((question_id, choice_id))
        })
        .collect()
}

#[derive(Clone, Debug)]
pub struct QuestionForm {
    pub id: i32,
    pub text: String,
    pub choices: Vec<choices::Model>,
    /// Previously submitted choice, if any.
    pub selected: Option<i32>,
}

impl QuestionForm {
    pub fn field(&self) -> String {
        answer_field(self.id)
    }

    pub fn is_selected(&self, choice_id: impl Borrow<i32>) -> bool {
        self.selected == Some(*choice_id.borrow())
    }
}

#[derive(Clone, Debug)]
pub struct AssignmentView {
    pub assignment_id: i32,
    pub survey_title: String,
    pub questions: Vec<QuestionForm>,
    /// Responses have already been recorded for the assignment.
    pub answered: bool,
}

/// Loads the survey behind an assignment for the answer form.
pub async fn load_assignment<C>(db: &C, access: &AssignmentAccess) -> Result<AssignmentView, AppError>
where
    C: ConnectionTrait,
{
    let questions = questions_for_survey(db, access.survey().id).await?;
    let question_ids: Vec<i32> = questions.iter().map(|q| q.id).collect();
    let mut choices_by_question: HashMap<i32, Vec<choices::Model>> = HashMap::new();
    for choice in choices_for_questions(db, &question_ids).await? {
        if let Some(question_id) = choice.question_id {
            choices_by_question.entry(question_id).or_default().push(choice);
        }
    }

    let selected: HashMap<i32, i32> = survey_responses::Entity::find()
        .filter(survey_responses::Column::SurveyAssignmentId.eq(access.assignment().id))
        .all(db)
        .await?
        .into_iter()
        .filter_map(|r| Some((r.question_id?, r.choice_id?)))
        .collect();

    let answered = !selected.is_empty();
    let questions = questions
        .into_iter()
        .map(|question| QuestionForm {
            id: question.id,
            selected: selected.get(&question.id).copied(),
            choices: choices_by_question.remove(&question.id).unwrap_or_default(),
            text: question.text,
        })
        .collect();

    Ok(AssignmentView {
        assignment_id: access.assignment().id,
        survey_title: access.survey().title.clone(),
        questions,
        answered,
    })
}

fn already_answered() -> AppError {
    AppError::field("assignment", "You have already answered this survey.")
}

/// Records one response per question of the assignment's survey.
/// Returns the number of responses created.
pub async fn submit_responses(
    db: &DatabaseConnection,
    access: &AssignmentAccess,
    answers: &Answers,
) -> Result<usize, AppError> {
    let assignment_id = access.assignment().id;
    let txn = db.begin().await?;

    let previous = survey_responses::Entity::find()
        .filter(survey_responses::Column::SurveyAssignmentId.eq(assignment_id))
        .count(&txn)
        .await?;
    if previous > 0 {
        txn.rollback().await?;
        return Err(already_answered());
    }

    let questions = questions_for_survey(&txn, access.survey().id).await?;

    let mut errors = FieldErrors::new();
    let mut picked = Vec::with_capacity(questions.len());
    for question in &questions {
        let choice_id = match answers.get(&question.id) {
            Some(choice_id) => *choice_id,
            None => {
                errors.add(answer_field(question.id), "Please choose an answer.");
                continue;
            }
        };

        let choice = match choices::Entity::find_by_id(choice_id).one(&txn).await? {
            Some(choice) => choice,
            None => {
                txn.rollback().await?;
                return Err(AppError::NotFound("Choice"));
            }
        };

        if choice.question_id != Some(question.id) {
            errors.add(
                answer_field(question.id),
                "That answer does not belong to this question.",
            );
            continue;
        }

        picked.push((question.id, choice.id));
    }

    if !errors.is_empty() {
        txn.rollback().await?;
        return Err(errors.into());
    }

    let now = Utc::now().naive_utc();
    for (question_id, choice_id) in &picked {
        let inserted = survey_responses::ActiveModel {
            survey_assignment_id: Set(Some(assignment_id)),
            question_id: Set(Some(*question_id)),
            choice_id: Set(Some(*choice_id)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await;

        // A concurrent submission got past the check above first.
        if let Err(e) = inserted {
            txn.rollback().await?;
            if db::is_unique_violation(&e) {
                log::debug!("Assignment {} was answered concurrently", assignment_id);
                return Err(already_answered());
            }
            return Err(e.into());
        }
    }

    txn.commit().await?;

    log::info!(
        "Recorded {} responses for assignment {}",
        picked.len(),
        assignment_id
    );

    Ok(picked.len())
}
