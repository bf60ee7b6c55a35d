//! Capability values proving an access check passed.
//!
//! Fields are private, so the only way to obtain one is through the
//! `require_*` checks below.

use super::{has_permission, Permission};
use crate::error::AppError;
use crate::orm::{survey_assignments, surveys};
use crate::user::Principal;
use sea_orm::{entity::*, ConnectionTrait};

/// The principal may view and answer this assignment.
#[derive(Clone, Debug)]
pub struct AssignmentAccess {
    assignment: survey_assignments::Model,
    survey: surveys::Model,
}

impl AssignmentAccess {
    pub fn assignment(&self) -> &survey_assignments::Model {
        &self.assignment
    }

    pub fn survey(&self) -> &surveys::Model {
        &self.survey
    }
}

/// The principal may view this survey's aggregated results.
#[derive(Clone, Debug)]
pub struct ResultsAccess {
    survey: surveys::Model,
}

impl ResultsAccess {
    pub fn survey(&self) -> &surveys::Model {
        &self.survey
    }
}

/// The principal created this survey and may manage its participants.
#[derive(Clone, Debug)]
pub struct SurveyOwnership {
    survey: surveys::Model,
}

impl SurveyOwnership {
    pub fn survey(&self) -> &surveys::Model {
        &self.survey
    }
}

async fn find_survey<C>(db: &C, survey_id: i32) -> Result<surveys::Model, AppError>
where
    C: ConnectionTrait,
{
    surveys::Entity::find_by_id(survey_id)
        .one(db)
        .await?
        .ok_or(AppError::NotFound("Survey"))
}

pub async fn require_assignment_access<C>(
    db: &C,
    principal: &Principal,
    assignment_id: i32,
) -> Result<AssignmentAccess, AppError>
where
    C: ConnectionTrait,
{
    let assignment = survey_assignments::Entity::find_by_id(assignment_id)
        .one(db)
        .await?
        .ok_or(AppError::NotFound("Survey assignment"))?;

    if !has_permission(db, principal.id, Permission::ViewAssignment, assignment.id).await? {
        log::warn!(
            "User {} denied access to assignment {}",
            principal.id,
            assignment.id
        );
        return Err(AppError::Forbidden(
            "This survey assignment belongs to someone else.",
        ));
    }

    let survey_id = assignment.survey_id.ok_or(AppError::NotFound("Survey"))?;
    let survey = find_survey(db, survey_id).await?;

    Ok(AssignmentAccess { assignment, survey })
}

pub async fn require_results_access<C>(
    db: &C,
    principal: &Principal,
    survey_id: i32,
) -> Result<ResultsAccess, AppError>
where
    C: ConnectionTrait,
{
    let survey = find_survey(db, survey_id).await?;

    if !has_permission(db, principal.id, Permission::ViewResults, survey.id).await? {
        log::warn!(
            "User {} denied access to results of survey {}",
            principal.id,
            survey.id
        );
        return Err(AppError::Forbidden(
            "You are not allowed to view the results of this survey.",
        ));
    }

    Ok(ResultsAccess { survey })
}

pub async fn require_survey_owner<C>(
    db: &C,
    principal: &Principal,
    survey_id: i32,
) -> Result<SurveyOwnership, AppError>
where
    C: ConnectionTrait,
{
    let survey = find_survey(db, survey_id).await?;

    if survey.created_by != Some(principal.id) {
        return Err(AppError::Forbidden("Only the survey's creator can manage it."));
    }

    Ok(SurveyOwnership { survey })
}
