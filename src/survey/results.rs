//! Response tallies per question and choice.

use super::{choices_for_questions, questions_for_survey};
use crate::orm::{choices, questions, survey_responses};
use crate::permission::ResultsAccess;
use sea_orm::{entity::*, query::*, ConnectionTrait, DbErr};
use std::borrow::Borrow;
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChoiceTally {
    pub choice: String,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuestionTally {
    pub question: String,
    pub choices: Vec<ChoiceTally>,
}

impl QuestionTally {
    /// Number of counted responses.
    pub fn total(&self) -> usize {
        self.choices.iter().map(|c| c.count).sum()
    }

    /// Share of counted responses, rounded down to a whole percent.
    pub fn percent(&self, count: impl Borrow<usize>) -> usize {
        match self.total() {
            0 => 0,
            total => count.borrow() * 100 / total,
        }
    }
}

/// Counts the responses to one question.
///
/// Every choice of the question starts at zero, in the order given.
/// Choices of other questions are ignored, as are responses to other
/// questions and responses naming a choice that is not one of this
/// question's.
pub fn tally(
    question: &questions::Model,
    choices: &[choices::Model],
    responses: &[survey_responses::Model],
) -> QuestionTally {
    let mut counts: Vec<ChoiceTally> = Vec::new();
    let mut index: HashMap<i32, usize> = HashMap::new();

    for choice in choices
        .iter()
        .filter(|c| c.question_id == Some(question.id))
    {
        index.insert(choice.id, counts.len());
        counts.push(ChoiceTally {
            choice: choice.text.clone(),
            count: 0,
        });
    }

    for response in responses
        .iter()
        .filter(|r| r.question_id == Some(question.id))
    {
        if let Some(&i) = response.choice_id.and_then(|id| index.get(&id)) {
            counts[i].count += 1;
        }
    }

    QuestionTally {
        question: question.text.clone(),
        choices: counts,
    }
}

/// Tallies every question of the survey, in creation order.
pub async fn aggregate_results<C>(db: &C, access: &ResultsAccess) -> Result<Vec<QuestionTally>, DbErr>
where
    C: ConnectionTrait,
{
    let questions = questions_for_survey(db, access.survey().id).await?;
    let question_ids: Vec<i32> = questions.iter().map(|q| q.id).collect();
    let choices = choices_for_questions(db, &question_ids).await?;

    let responses = if question_ids.is_empty() {
        Vec::new()
    } else {
        survey_responses::Entity::find()
            .filter(survey_responses::Column::QuestionId.is_in(question_ids))
            .all(db)
            .await?
    };

    Ok(questions
        .iter()
        .map(|question| tally(question, &choices, &responses))
        .collect())
}
