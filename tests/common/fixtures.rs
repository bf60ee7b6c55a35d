//! Test fixtures for creating test data
#![allow(dead_code)]

use chrono::Utc;
use sea_orm::{entity::*, ActiveValue::Set, DatabaseConnection, DbErr};
use surveyor::error::AppError;
use surveyor::orm::{survey_assignments, users};
use surveyor::survey::{self, QuestionSpec, SurveyDraft};
use surveyor::token::AccountTokens;
use surveyor::user::Principal;

pub const TEST_PASSWORD: &str = "password123";

/// Create a test user whose password is [`TEST_PASSWORD`].
pub async fn create_test_user(
    db: &DatabaseConnection,
    username: &str,
    active: bool,
) -> Result<users::Model, DbErr> {
    let password = surveyor::session::hash_password(TEST_PASSWORD)
        .map_err(|e| DbErr::Custom(format!("Password hashing failed: {}", e)))?;

    users::ActiveModel {
        username: Set(username.to_owned()),
        email: Set(format!("{}@test.com", username)),
        password: Set(password),
        is_active: Set(active),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub fn principal(user: &users::Model) -> Principal {
    Principal::from(user.clone())
}

pub fn test_tokens() -> AccountTokens {
    AccountTokens::new(
        b"integration test secret, never used outside the test suite",
        chrono::Duration::hours(72),
    )
}

/// Two questions, "Lunch?" (Pizza, Soup) and "Coffee?" (Yes, No).
pub fn lunch_draft(assignees: &[i32], reviewers: &[i32]) -> SurveyDraft {
    SurveyDraft {
        title: "Team lunch".to_owned(),
        questions: vec![
            QuestionSpec::new("Lunch?", &["Pizza", "Soup"]),
            QuestionSpec::new("Coffee?", &["Yes", "No"]),
        ],
        assignees: assignees.to_vec(),
        reviewers: reviewers.to_vec(),
    }
}

pub async fn create_lunch_survey(
    db: &DatabaseConnection,
    owner: &users::Model,
    assignees: &[i32],
    reviewers: &[i32],
) -> Result<i32, AppError> {
    survey::create_survey(db, &principal(owner), &lunch_draft(assignees, reviewers)).await
}

/// The assignment of `user_id` for the survey.
pub async fn find_assignment(
    db: &DatabaseConnection,
    survey_id: i32,
    user_id: i32,
) -> Result<Option<survey_assignments::Model>, DbErr> {
    use sea_orm::query::*;

    survey_assignments::Entity::find()
        .filter(survey_assignments::Column::SurveyId.eq(survey_id))
        .filter(survey_assignments::Column::AssignedTo.eq(user_id))
        .one(db)
        .await
}
