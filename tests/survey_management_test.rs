/// Integration tests for adding participants to a survey and the profile listings
mod common;

use common::*;
use sea_orm::{entity::*, query::*};
use surveyor::error::AppError;
use surveyor::orm::survey_assignments;
use surveyor::permission::{self, Permission};
use surveyor::survey::{self, listing, Participants};

#[actix_rt::test]
async fn test_add_participants_is_idempotent() {
    let db = setup_test_database()
        .await
        .expect("Failed to set up test database");
    let owner = create_test_user(&db, "owner", true).await.unwrap();
    let alice = create_test_user(&db, "alice", true).await.unwrap();
    let bob = create_test_user(&db, "bob", true).await.unwrap();
    let survey_id = create_lunch_survey(&db, &owner, &[alice.id], &[])
        .await
        .unwrap();
    let ownership = permission::require_survey_owner(&db, &principal(&owner), survey_id)
        .await
        .unwrap();

    let participants = Participants {
        assignees: vec![alice.id, bob.id, bob.id],
        reviewers: vec![],
    };
    let added = survey::add_participants(&db, &ownership, &principal(&owner), &participants)
        .await
        .unwrap();
    assert_eq!(added, 1, "Only Bob is new");

    let added = survey::add_participants(&db, &ownership, &principal(&owner), &participants)
        .await
        .unwrap();
    assert_eq!(added, 0, "Nobody is new the second time");

    let count = survey_assignments::Entity::find()
        .filter(survey_assignments::Column::SurveyId.eq(survey_id))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(count, 2);

    let bobs = find_assignment(&db, survey_id, bob.id).await.unwrap().unwrap();
    assert!(
        permission::has_permission(&db, bob.id, Permission::ViewAssignment, bobs.id)
            .await
            .unwrap()
    );
}

#[actix_rt::test]
async fn test_add_reviewers() {
    let db = setup_test_database()
        .await
        .expect("Failed to set up test database");
    let owner = create_test_user(&db, "owner", true).await.unwrap();
    let alice = create_test_user(&db, "alice", true).await.unwrap();
    let carol = create_test_user(&db, "carol", true).await.unwrap();
    let survey_id = create_lunch_survey(&db, &owner, &[alice.id], &[])
        .await
        .unwrap();
    let ownership = permission::require_survey_owner(&db, &principal(&owner), survey_id)
        .await
        .unwrap();

    let added = survey::add_participants(
        &db,
        &ownership,
        &principal(&owner),
        &Participants {
            assignees: vec![],
            reviewers: vec![carol.id],
        },
    )
    .await
    .unwrap();
    assert_eq!(added, 0, "Reviewers are not assignments");

    let viewers: Vec<String> = listing::survey_result_viewers(&db, survey_id)
        .await
        .unwrap()
        .into_iter()
        .map(|u| u.name)
        .collect();
    assert_eq!(viewers, vec!["owner", "carol"]);

    assert!(permission::require_results_access(&db, &principal(&carol), survey_id)
        .await
        .is_ok());
}

#[actix_rt::test]
async fn test_add_participants_validation() {
    let db = setup_test_database()
        .await
        .expect("Failed to set up test database");
    let owner = create_test_user(&db, "owner", true).await.unwrap();
    let alice = create_test_user(&db, "alice", true).await.unwrap();
    let survey_id = create_lunch_survey(&db, &owner, &[alice.id], &[])
        .await
        .unwrap();
    let ownership = permission::require_survey_owner(&db, &principal(&owner), survey_id)
        .await
        .unwrap();

    let err = survey::add_participants(&db, &ownership, &principal(&owner), &Participants::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(ref e) if e.contains("assignees")));

    let err = survey::add_participants(
        &db,
        &ownership,
        &principal(&owner),
        &Participants {
            assignees: vec![4242],
            reviewers: vec![],
        },
    )
    .await
    .unwrap_err();
    match err {
        AppError::Validation(errors) => {
            assert_eq!(errors.message("assignees"), "There is no user with id 4242.");
        }
        other => panic!("Expected validation error, got {:?}", other),
    }
}

#[actix_rt::test]
async fn test_assignee_status_and_profile() {
    let db = setup_test_database()
        .await
        .expect("Failed to set up test database");
    let owner = create_test_user(&db, "owner", true).await.unwrap();
    let alice = create_test_user(&db, "alice", true).await.unwrap();
    let bob = create_test_user(&db, "bob", true).await.unwrap();
    let survey_id = create_lunch_survey(&db, &owner, &[alice.id, bob.id], &[])
        .await
        .unwrap();

    // Alice answers.
    let assignment = find_assignment(&db, survey_id, alice.id).await.unwrap().unwrap();
    let access = permission::require_assignment_access(&db, &principal(&alice), assignment.id)
        .await
        .unwrap();
    let view = survey::load_assignment(&db, &access).await.unwrap();
    let answers: survey::Answers = view
        .questions
        .iter()
        .map(|q| (q.id, q.choices[0].id))
        .collect();
    survey::submit_responses(&db, &access, &answers).await.unwrap();

    let statuses: Vec<(String, bool)> = listing::survey_assignees(&db, survey_id)
        .await
        .unwrap()
        .into_iter()
        .map(|s| (s.user.name, s.answered))
        .collect();
    assert_eq!(
        statuses,
        vec![("alice".to_owned(), true), ("bob".to_owned(), false)]
    );

    let profile = survey::load_profile(&db, &principal(&owner)).await.unwrap();
    assert_eq!(profile.owned.len(), 1);
    assert_eq!(profile.owned[0].id, survey_id);
    assert!(profile.assignments.is_empty());
    assert_eq!(profile.results.len(), 1);

    let profile = survey::load_profile(&db, &principal(&alice)).await.unwrap();
    assert!(profile.owned.is_empty());
    assert!(profile.results.is_empty());
    assert_eq!(profile.assignments.len(), 1);
    assert_eq!(profile.assignments[0].survey_title, "Team lunch");
    assert!(profile.assignments[0].answered);

    let profile = survey::load_profile(&db, &principal(&bob)).await.unwrap();
    assert_eq!(profile.assignments.len(), 1);
    assert!(!profile.assignments[0].answered);
}
