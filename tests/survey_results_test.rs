/// Integration tests for survey results and who may see them
mod common;

use common::*;
use surveyor::error::AppError;
use surveyor::orm::users;
use surveyor::permission;
use surveyor::survey::{self, Answers};

async fn answer(db: &sea_orm::DatabaseConnection, survey_id: i32, user: &users::Model, picks: &[&str]) {
    let assignment = find_assignment(db, survey_id, user.id)
        .await
        .unwrap()
        .expect("User should be assigned");
    let access = permission::require_assignment_access(db, &principal(user), assignment.id)
        .await
        .unwrap();
    let view = survey::load_assignment(db, &access).await.unwrap();

    let answers: Answers = view
        .questions
        .iter()
        .zip(picks)
        .map(|(q, text)| {
            let choice = q.choices.iter().find(|c| c.text == *text).unwrap();
            (q.id, choice.id)
        })
        .collect();
    survey::submit_responses(db, &access, &answers).await.unwrap();
}

fn counts(tally: &survey::QuestionTally) -> Vec<(&str, usize)> {
    tally
        .choices
        .iter()
        .map(|c| (c.choice.as_str(), c.count))
        .collect()
}

#[actix_rt::test]
async fn test_results_count_every_choice() {
    let db = setup_test_database()
        .await
        .expect("Failed to set up test database");
    let owner = create_test_user(&db, "owner", true).await.unwrap();
    let alice = create_test_user(&db, "alice", true).await.unwrap();
    let bob = create_test_user(&db, "bob", true).await.unwrap();
    let carol = create_test_user(&db, "carol", true).await.unwrap();
    let survey_id = create_lunch_survey(&db, &owner, &[alice.id, bob.id, carol.id], &[])
        .await
        .unwrap();

    answer(&db, survey_id, &alice, &["Pizza", "Yes"]).await;
    answer(&db, survey_id, &bob, &["Pizza", "Yes"]).await;
    answer(&db, survey_id, &carol, &["Soup", "Yes"]).await;

    let access = permission::require_results_access(&db, &principal(&owner), survey_id)
        .await
        .expect("Owner should see results");
    let results = survey::aggregate_results(&db, &access).await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].question, "Lunch?");
    assert_eq!(counts(&results[0]), vec![("Pizza", 2), ("Soup", 1)]);
    assert_eq!(results[1].question, "Coffee?");
    assert_eq!(counts(&results[1]), vec![("Yes", 3), ("No", 0)]);
    assert_eq!(results[1].total(), 3);
}

#[actix_rt::test]
async fn test_results_before_any_answer() {
    let db = setup_test_database()
        .await
        .expect("Failed to set up test database");
    let owner = create_test_user(&db, "owner", true).await.unwrap();
    let alice = create_test_user(&db, "alice", true).await.unwrap();
    let survey_id = create_lunch_survey(&db, &owner, &[alice.id], &[])
        .await
        .unwrap();

    let access = permission::require_results_access(&db, &principal(&owner), survey_id)
        .await
        .unwrap();
    let results = survey::aggregate_results(&db, &access).await.unwrap();
    assert_eq!(counts(&results[0]), vec![("Pizza", 0), ("Soup", 0)]);
    assert_eq!(results[0].percent(0usize), 0);
}

#[actix_rt::test]
async fn test_results_access() {
    let db = setup_test_database()
        .await
        .expect("Failed to set up test database");
    let owner = create_test_user(&db, "owner", true).await.unwrap();
    let alice = create_test_user(&db, "alice", true).await.unwrap();
    let reviewer = create_test_user(&db, "reviewer", true).await.unwrap();
    let survey_id = create_lunch_survey(&db, &owner, &[alice.id], &[reviewer.id])
        .await
        .unwrap();

    assert!(
        permission::require_results_access(&db, &principal(&reviewer), survey_id)
            .await
            .is_ok(),
        "Reviewer should see results through the results group"
    );

    let err = permission::require_results_access(&db, &principal(&alice), survey_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)), "{:?}", err);

    let err = permission::require_results_access(&db, &principal(&owner), survey_id + 100)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound("Survey")), "{:?}", err);
}
