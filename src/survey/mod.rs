//! Survey workflows.
//!
//! - [`create`]: survey authoring, assignment and result-viewer grants
//! - [`respond`]: all-or-nothing response submission
//! - [`results`]: per-choice response tallies
//! - [`listing`]: read models for the profile and management pages

pub mod create;
pub mod listing;
pub mod respond;
pub mod results;

pub use create::{add_participants, create_survey, ChoiceSpec, Participants, QuestionSpec, SurveyDraft};
pub use listing::{load_profile, AssigneeStatus, AssignmentSummary, Profile};
pub use respond::{answers_from_form, load_assignment, submit_responses, Answers, AssignmentView};
pub use results::{aggregate_results, tally, ChoiceTally, QuestionTally};

use crate::orm::{choices, questions};
use sea_orm::{entity::*, query::*, ConnectionTrait, DbErr};

/// Questions of a survey in creation order.
pub(crate) async fn questions_for_survey<C>(
    db: &C,
    survey_id: i32,
) -> Result<Vec<questions::Model>, DbErr>
where
    C: ConnectionTrait,
{
    questions::Entity::find()
        .filter(questions::Column::SurveyId.eq(survey_id))
        .order_by_asc(questions::Column::Id)
        .all(db)
        .await
}

/// Choices of the given questions in creation order.
pub(crate) async fn choices_for_questions<C>(
    db: &C,
    question_ids: &[i32],
) -> Result<Vec<choices::Model>, DbErr>
where
    C: ConnectionTrait,
{
    if question_ids.is_empty() {
        return Ok(Vec::new());
    }

    choices::Entity::find()
        .filter(choices::Column::QuestionId.is_in(question_ids.to_vec()))
        .order_by_asc(choices::Column::Id)
        .all(db)
        .await
}
