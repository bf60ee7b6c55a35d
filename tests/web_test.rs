/// HTTP tests driving the full middleware stack: session cookie, client context and CSRF
mod common;

use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::cookie::{Cookie, Key};
use actix_web::http::{header, StatusCode};
use actix_web::{test, web::Data, App};
use common::*;
use sea_orm::{EntityTrait, PaginatorTrait};
use surveyor::middleware::ClientCtx;

macro_rules! test_app {
    ($db:expr) => {
        test::init_service(
            App::new()
                .app_data(Data::new($db.clone()))
                .app_data(Data::new(test_tokens()))
                .wrap(ClientCtx::default())
                .wrap(
                    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
                        .cookie_secure(false)
                        .build(),
                )
                .configure(surveyor::web::configure),
        )
        .await
    };
}

fn location(resp: &actix_web::dev::ServiceResponse) -> &str {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

fn session_cookie(resp: &actix_web::dev::ServiceResponse) -> Option<Cookie<'static>> {
    resp.response()
        .cookies()
        .find(|c| c.name() == "id")
        .map(|c| c.into_owned())
}

/// Pulls the hidden CSRF token out of a rendered form.
fn csrf_from_body(body: &str) -> String {
    let marker = "name=\"csrf_token\" value=\"";
    let start = body.find(marker).expect("Form should carry a CSRF token") + marker.len();
    let end = body[start..].find('"').unwrap() + start;
    body[start..end].to_owned()
}

#[actix_rt::test]
async fn test_guests_are_sent_to_login() {
    let db = setup_test_database()
        .await
        .expect("Failed to set up test database");
    let app = test_app!(db);

    for uri in [
        "/",
        "/profile/",
        "/surveys/create/",
        "/survey-assginment/1/",
        "/survey-management/1/",
        "/survey-results/1/",
    ] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::FOUND, "{}", uri);
        let expected = if uri == "/" { "/profile/" } else { "/login/" };
        assert_eq!(location(&resp), expected, "{}", uri);
    }

    let resp = test::call_service(&app, test::TestRequest::get().uri("/login/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn test_post_without_csrf_token_is_forbidden() {
    let db = setup_test_database()
        .await
        .expect("Failed to set up test database");
    create_test_user(&db, "alice", true).await.unwrap();
    let app = test_app!(db);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/login/").to_request()).await;
    let cookie = session_cookie(&resp).expect("Session cookie should be set");

    let req = test::TestRequest::post()
        .uri("/login/")
        .cookie(cookie)
        .set_form(&[
            ("username", "alice"),
            ("password", TEST_PASSWORD),
            ("csrf_token", "not the token"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_rt::test]
async fn test_login_then_view_profile_and_assignment() {
    let db = setup_test_database()
        .await
        .expect("Failed to set up test database");
    let owner = create_test_user(&db, "owner", true).await.unwrap();
    let alice = create_test_user(&db, "alice", true).await.unwrap();
    let survey_id = create_lunch_survey(&db, &owner, &[alice.id], &[])
        .await
        .unwrap();
    let assignment = find_assignment(&db, survey_id, alice.id)
        .await
        .unwrap()
        .unwrap();
    let app = test_app!(db);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/login/").to_request()).await;
    let cookie = session_cookie(&resp).expect("Session cookie should be set");
    let body = test::read_body(resp).await;
    let csrf = csrf_from_body(std::str::from_utf8(&body).unwrap());

    let req = test::TestRequest::post()
        .uri("/login/")
        .cookie(cookie)
        .set_form(&[
            ("username", "alice"),
            ("password", TEST_PASSWORD),
            ("csrf_token", csrf.as_str()),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/profile/");
    let cookie = session_cookie(&resp).expect("Login should update the session cookie");

    let req = test::TestRequest::get()
        .uri("/profile/")
        .cookie(cookie.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    let body = std::str::from_utf8(&body).unwrap();
    assert!(body.contains("alice"));
    assert!(body.contains("Team lunch"));

    let req = test::TestRequest::get()
        .uri(&format!("/survey-assginment/{}/", assignment.id))
        .cookie(cookie.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    assert!(std::str::from_utf8(&body).unwrap().contains("Lunch?"));

    // Alice is an assignee, not a reviewer.
    let req = test::TestRequest::get()
        .uri(&format!("/survey-results/{}/", survey_id))
        .cookie(cookie.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::get()
        .uri(&format!("/survey-management/{}/", survey_id))
        .cookie(cookie)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_rt::test]
async fn test_incomplete_survey_form_is_shown_again_with_errors() {
    let db = setup_test_database()
        .await
        .expect("Failed to set up test database");
    create_test_user(&db, "owner", true).await.unwrap();
    let app = test_app!(db);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/login/").to_request()).await;
    let cookie = session_cookie(&resp).expect("Session cookie should be set");
    let body = test::read_body(resp).await;
    let csrf = csrf_from_body(std::str::from_utf8(&body).unwrap());

    let req = test::TestRequest::post()
        .uri("/login/")
        .cookie(cookie)
        .set_form(&[
            ("username", "owner"),
            ("password", TEST_PASSWORD),
            ("csrf_token", csrf.as_str()),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(location(&resp), "/profile/");
    let cookie = session_cookie(&resp).expect("Login should update the session cookie");

    let req = test::TestRequest::get()
        .uri("/surveys/create/")
        .cookie(cookie.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = session_cookie(&resp).unwrap_or(cookie);
    let body = test::read_body(resp).await;
    let csrf = csrf_from_body(std::str::from_utf8(&body).unwrap());

    // No title, an unreadable question, no assignees and an unknown reviewer.
    let req = test::TestRequest::post()
        .uri("/surveys/create/")
        .cookie(cookie)
        .set_form(&[
            ("title", "   "),
            ("questions", "Where?"),
            ("reviewers", "9999"),
            ("csrf_token", csrf.as_str()),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    let body = std::str::from_utf8(&body).unwrap();

    assert!(body.contains("title is required"));
    assert!(body.contains("Question 1 could not be read."));
    assert!(body.contains("assignees are required"));
    assert!(body.contains("There is no user with id 9999."));
    // The question is echoed back so it is not lost.
    assert!(body.contains("name=\"questions\" value=\"Where?\""));

    let surveys = surveyor::orm::surveys::Entity::find().count(&db).await.unwrap();
    assert_eq!(surveys, 0);
}
