//! Read models for the profile and survey management pages.

use crate::orm::{survey_assignments, survey_responses, surveys};
use crate::permission::{self, Permission};
use crate::user::{self, Principal, UserSummary};
use sea_orm::{entity::*, query::*, ConnectionTrait, DbErr};
use std::collections::{HashMap, HashSet};

/// One of the principal's assignments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssignmentSummary {
    pub id: i32,
    pub survey_title: String,
    pub answered: bool,
}

/// An assignee of a survey and whether they have answered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssigneeStatus {
    pub user: UserSummary,
    pub assignment_id: i32,
    pub answered: bool,
}

#[derive(Debug)]
pub struct Profile {
    pub owned: Vec<surveys::Model>,
    pub assignments: Vec<AssignmentSummary>,
    pub results: Vec<surveys::Model>,
}

async fn answered_assignments<C>(db: &C, assignment_ids: &[i32]) -> Result<HashSet<i32>, DbErr>
where
    C: ConnectionTrait,
{
    if assignment_ids.is_empty() {
        return Ok(HashSet::new());
    }

    Ok(survey_responses::Entity::find()
        .filter(survey_responses::Column::SurveyAssignmentId.is_in(assignment_ids.to_vec()))
        .all(db)
        .await?
        .into_iter()
        .filter_map(|r| r.survey_assignment_id)
        .collect())
}

pub async fn surveys_created_by<C>(db: &C, user_id: i32) -> Result<Vec<surveys::Model>, DbErr>
where
    C: ConnectionTrait,
{
    surveys::Entity::find()
        .filter(surveys::Column::CreatedBy.eq(user_id))
        .order_by_desc(surveys::Column::Id)
        .all(db)
        .await
}

pub async fn assignments_for_user<C>(db: &C, user_id: i32) -> Result<Vec<AssignmentSummary>, DbErr>
where
    C: ConnectionTrait,
{
    let rows = survey_assignments::Entity::find()
        .filter(survey_assignments::Column::AssignedTo.eq(user_id))
        .order_by_desc(survey_assignments::Column::Id)
        .find_also_related(surveys::Entity)
        .all(db)
        .await?;

    let ids: Vec<i32> = rows.iter().map(|(a, _)| a.id).collect();
    let answered = answered_assignments(db, &ids).await?;

    Ok(rows
        .into_iter()
        // Assignments of deleted surveys have nothing to answer.
        .filter_map(|(assignment, survey)| {
            Some(AssignmentSummary {
                id: assignment.id,
                survey_title: survey?.title,
                answered: answered.contains(&assignment.id),
            })
        })
        .collect())
}

/// Surveys whose results the user may view, directly or through a group.
pub async fn surveys_with_results_for<C>(db: &C, user_id: i32) -> Result<Vec<surveys::Model>, DbErr>
where
    C: ConnectionTrait,
{
    let ids = permission::objects_for_user(db, user_id, Permission::ViewResults).await?;
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    surveys::Entity::find()
        .filter(surveys::Column::Id.is_in(ids))
        .order_by_desc(surveys::Column::Id)
        .all(db)
        .await
}

pub async fn load_profile<C>(db: &C, principal: &Principal) -> Result<Profile, DbErr>
where
    C: ConnectionTrait,
{
    Ok(Profile {
        owned: surveys_created_by(db, principal.id).await?,
        assignments: assignments_for_user(db, principal.id).await?,
        results: surveys_with_results_for(db, principal.id).await?,
    })
}

/// Assignees of a survey in assignment order.
pub async fn survey_assignees<C>(db: &C, survey_id: i32) -> Result<Vec<AssigneeStatus>, DbErr>
where
    C: ConnectionTrait,
{
    let assignments = survey_assignments::Entity::find()
        .filter(survey_assignments::Column::SurveyId.eq(survey_id))
        .order_by_asc(survey_assignments::Column::Id)
        .all(db)
        .await?;

    let ids: Vec<i32> = assignments.iter().map(|a| a.id).collect();
    let answered = answered_assignments(db, &ids).await?;

    let user_ids: Vec<i32> = assignments.iter().filter_map(|a| a.assigned_to).collect();
    let users: HashMap<i32, UserSummary> = user::get_summaries(db, &user_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    Ok(assignments
        .into_iter()
        .filter_map(|assignment| {
            let user = users.get(&assignment.assigned_to?)?.clone();
            Some(AssigneeStatus {
                user,
                assignment_id: assignment.id,
                answered: answered.contains(&assignment.id),
            })
        })
        .collect())
}

/// Users who may view a survey's results.
pub async fn survey_result_viewers<C>(db: &C, survey_id: i32) -> Result<Vec<UserSummary>, DbErr>
where
    C: ConnectionTrait,
{
    let ids = permission::users_with_permission(db, Permission::ViewResults, survey_id).await?;
    user::get_summaries(db, &ids).await
}
