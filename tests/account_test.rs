/// Integration tests for registration, email confirmation, login and password reset
mod common;

use common::*;
use surveyor::error::AppError;
use surveyor::orm::users;
use sea_orm::entity::*;
use surveyor::session::{get_session, new_session};
use surveyor::web::login::{login, LoginResult};
use surveyor::web::password_reset::{
    check_reset_link, request_reset, reset_password, PasswordResetConfirmForm,
};
use surveyor::web::register::{confirm_email, register_user, RegisterForm};

fn registration(username: &str, email: &str) -> RegisterForm {
    RegisterForm {
        username: username.to_owned(),
        email: email.to_owned(),
        password: "correct horse".to_owned(),
        password_confirm: "correct horse".to_owned(),
        csrf_token: String::new(),
    }
}

fn new_password(password: &str, confirm: &str) -> PasswordResetConfirmForm {
    PasswordResetConfirmForm {
        password: password.to_owned(),
        password_confirm: confirm.to_owned(),
        csrf_token: String::new(),
    }
}

#[actix_rt::test]
async fn test_register_confirm_and_login() {
    let db = setup_test_database()
        .await
        .expect("Failed to set up test database");
    let tokens = test_tokens();

    let user = register_user(&db, &registration(" alice ", "alice@example.com"), 8)
        .await
        .expect("Registration should succeed");
    assert_eq!(user.username, "alice", "Username should be trimmed");
    assert!(!user.is_active, "New accounts wait for confirmation");

    assert!(matches!(
        login(&db, "alice", "correct horse").await.unwrap(),
        LoginResult::Inactive
    ));

    let token = tokens.confirm.make_token(&user);
    let confirmed = confirm_email(&db, &tokens, user.id, &token)
        .await
        .unwrap()
        .expect("Fresh token should confirm");
    assert!(confirmed.is_active);

    // The token dies with the state it was issued for.
    assert!(confirm_email(&db, &tokens, user.id, &token)
        .await
        .unwrap()
        .is_none());

    match login(&db, "alice", "correct horse").await.unwrap() {
        LoginResult::Success(found) => assert_eq!(found.id, user.id),
        other => panic!("Expected login to succeed, got {:?}", other),
    }
    assert!(matches!(
        login(&db, "alice", "wrong horse").await.unwrap(),
        LoginResult::BadPassword
    ));
    assert!(matches!(
        login(&db, "nobody", "correct horse").await.unwrap(),
        LoginResult::BadName
    ));
}

#[actix_rt::test]
async fn test_confirm_rejects_bad_links() {
    let db = setup_test_database()
        .await
        .expect("Failed to set up test database");
    let tokens = test_tokens();
    let user = register_user(&db, &registration("alice", "alice@example.com"), 8)
        .await
        .unwrap();

    assert!(confirm_email(&db, &tokens, user.id, "garbage").await.unwrap().is_none());
    assert!(confirm_email(&db, &tokens, user.id + 1, &tokens.confirm.make_token(&user))
        .await
        .unwrap()
        .is_none());
    // A reset token is not a confirmation token.
    assert!(confirm_email(&db, &tokens, user.id, &tokens.reset.make_token(&user))
        .await
        .unwrap()
        .is_none());

    let still_pending = users::Entity::find_by_id(user.id).one(&db).await.unwrap().unwrap();
    assert!(!still_pending.is_active);
}

#[actix_rt::test]
async fn test_register_rejects_duplicates() {
    let db = setup_test_database()
        .await
        .expect("Failed to set up test database");
    register_user(&db, &registration("alice", "alice@example.com"), 8)
        .await
        .unwrap();

    let err = register_user(&db, &registration("alice", "other@example.com"), 8)
        .await
        .unwrap_err();
    match err {
        AppError::Validation(errors) => {
            assert_eq!(errors.message("username"), "That username is taken.");
            assert!(!errors.contains("email"));
        }
        other => panic!("Expected validation error, got {:?}", other),
    }

    let err = register_user(&db, &registration("alicia", "alice@example.com"), 8)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(ref e) if e.contains("email")));

    let mut short = registration("bob", "bob@example.com");
    short.password = "short".to_owned();
    short.password_confirm = "short".to_owned();
    let err = register_user(&db, &short, 8).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(ref e) if e.contains("password")));
}

#[actix_rt::test]
async fn test_password_reset_flow() {
    let db = setup_test_database()
        .await
        .expect("Failed to set up test database");
    let tokens = test_tokens();
    let alice = create_test_user(&db, "alice", true).await.unwrap();

    assert!(request_reset(&db, &tokens, "alice@test.com").await.unwrap());

    let token = tokens.reset.make_token(&alice);
    assert!(check_reset_link(&db, &tokens, alice.id, &token)
        .await
        .unwrap()
        .is_some());

    let err = reset_password(&db, &tokens, alice.id, &token, &new_password("new password", "typo"), 8)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(ref e) if e.contains("password_confirm")));

    let updated = reset_password(
        &db,
        &tokens,
        alice.id,
        &token,
        &new_password("new password", "new password"),
        8,
    )
    .await
    .unwrap()
    .expect("Valid link should reset the password");
    assert_eq!(updated.id, alice.id);

    assert!(matches!(
        login(&db, "alice", "new password").await.unwrap(),
        LoginResult::Success(_)
    ));
    assert!(matches!(
        login(&db, "alice", TEST_PASSWORD).await.unwrap(),
        LoginResult::BadPassword
    ));

    // Used links stop working once the password changed.
    assert!(check_reset_link(&db, &tokens, alice.id, &token)
        .await
        .unwrap()
        .is_none());
    assert!(reset_password(
        &db,
        &tokens,
        alice.id,
        &token,
        &new_password("another one", "another one"),
        8,
    )
    .await
    .unwrap()
    .is_none());
}

#[actix_rt::test]
async fn test_password_reset_ends_existing_sessions() {
    let db = setup_test_database()
        .await
        .expect("Failed to set up test database");
    let tokens = test_tokens();
    let alice = create_test_user(&db, "alice", true).await.unwrap();
    let bob = create_test_user(&db, "bob", true).await.unwrap();

    let ttl = chrono::Duration::hours(1);
    let alice_laptop = new_session(&db, alice.id, ttl).await.unwrap();
    let alice_phone = new_session(&db, alice.id, ttl).await.unwrap();
    let bob_session = new_session(&db, bob.id, ttl).await.unwrap();
    assert!(get_session(&db, alice_laptop).await.unwrap().is_some());

    let token = tokens.reset.make_token(&alice);
    reset_password(
        &db,
        &tokens,
        alice.id,
        &token,
        &new_password("new password", "new password"),
        8,
    )
    .await
    .unwrap()
    .expect("Valid link should reset the password");

    assert!(get_session(&db, alice_laptop).await.unwrap().is_none());
    assert!(get_session(&db, alice_phone).await.unwrap().is_none());
    assert_eq!(
        get_session(&db, bob_session).await.unwrap().map(|s| s.user_id),
        Some(bob.id)
    );

    // Logging in again afterwards works as usual.
    let fresh = new_session(&db, alice.id, ttl).await.unwrap();
    assert_eq!(
        get_session(&db, fresh).await.unwrap().map(|s| s.user_id),
        Some(alice.id)
    );
}

#[actix_rt::test]
async fn test_reset_ignores_unknown_and_inactive() {
    let db = setup_test_database()
        .await
        .expect("Failed to set up test database");
    let tokens = test_tokens();
    let pending = create_test_user(&db, "pending", false).await.unwrap();

    assert!(!request_reset(&db, &tokens, "nobody@test.com").await.unwrap());
    assert!(!request_reset(&db, &tokens, "pending@test.com").await.unwrap());

    let token = tokens.reset.make_token(&pending);
    assert!(check_reset_link(&db, &tokens, pending.id, &token)
        .await
        .unwrap()
        .is_none());
}
