mod common;

use common::TestApp;
use recipe_api::{cryptography::verify_password, Store};
use serde_json::{json, Value};
use warp::http::StatusCode;

fn signup_payload() -> Value {
    json!({
        "email": "test@EXAMPLE.com",
        "password": "testpass123",
        "name": "Test Name",
    })
}

#[tokio::test]
async fn create_user_success() {
    let app = TestApp::new();

    let response = app.request("POST", "/users", None, Some(signup_payload())).await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(
        response.body,
        json!({"email": "test@example.com", "name": "Test Name"})
    );
    let user = app
        .store
        .find_user_by_email("test@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_ne!(user.password, "testpass123");
    assert!(verify_password("testpass123", &user.password).unwrap());
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let app = TestApp::new();
    app.user("test@example.com").await;

    let response = app.request("POST", "/users", None, Some(signup_payload())).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["email"].is_array());
}

#[tokio::test]
async fn short_password_is_rejected() {
    let app = TestApp::new();
    let mut payload = signup_payload();
    payload["password"] = json!("pw");

    let response = app.request("POST", "/users", None, Some(payload)).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["password"].is_array());
    assert!(app
        .store
        .find_user_by_email("test@example.com")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn missing_fields_are_reported_together() {
    let app = TestApp::new();

    let response = app.request("POST", "/users", None, Some(json!({}))).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    for field in ["email", "password", "name"] {
        assert!(response.body[field].is_array(), "{field}");
    }
}

#[tokio::test]
async fn token_for_valid_credentials() {
    let app = TestApp::new();
    app.request("POST", "/users", None, Some(signup_payload())).await;

    let response = app
        .request(
            "POST",
            "/users/token",
            None,
            Some(json!({"email": "test@example.com", "password": "testpass123"})),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let token = response.body["token"].as_str().unwrap();

    let me = app.request("GET", "/users/me", Some(token), None).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body, json!({"email": "test@example.com", "name": "Test Name"}));
}

#[tokio::test]
async fn token_rejects_bad_credentials() {
    let app = TestApp::new();
    app.request("POST", "/users", None, Some(signup_payload())).await;

    let wrong_password = app
        .request(
            "POST",
            "/users/token",
            None,
            Some(json!({"email": "test@example.com", "password": "badpass"})),
        )
        .await;
    assert_eq!(wrong_password.status, StatusCode::BAD_REQUEST);
    assert!(wrong_password.body.get("token").is_none());
    assert!(wrong_password.body["non_field_errors"].is_array());

    let unknown_user = app
        .request(
            "POST",
            "/users/token",
            None,
            Some(json!({"email": "nobody@example.com", "password": "testpass123"})),
        )
        .await;
    assert_eq!(unknown_user.status, StatusCode::BAD_REQUEST);

    let blank_password = app
        .request(
            "POST",
            "/users/token",
            None,
            Some(json!({"email": "test@example.com", "password": ""})),
        )
        .await;
    assert_eq!(blank_password.status, StatusCode::BAD_REQUEST);
    assert!(blank_password.body["password"].is_array());
}

#[tokio::test]
async fn me_requires_authentication() {
    let app = TestApp::new();

    let response = app.request("GET", "/users/me", None, None).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(response.body["detail"].is_string());
}

#[tokio::test]
async fn me_accepts_session_cookie() {
    let app = TestApp::new();
    let user = app.user("cookie@example.com").await;
    let store: recipe_api::SharedStore = app.store.clone();

    let response = warp::test::request()
        .method("GET")
        .path("/users/me")
        .header("cookie", format!("session={}", user.token))
        .reply(&recipe_api::api(store, app.keys.clone()))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(body["email"], "cookie@example.com");
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new();

    let response = app.request("GET", "/health", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({"healthy": true}));
}
