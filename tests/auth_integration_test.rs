//! Sign-up, sign-in, session and sign-out over HTTP.

mod common;

use axum::http::Method;
use common::{response_json, TestApp, ADMIN_EMAIL, PASSWORD};
use serde_json::json;

#[tokio::test]
async fn sign_up_then_sign_in() {
    let app = TestApp::new().await;

    let created = app
        .request(
            Method::POST,
            "/auth/sign-up",
            Some(json!({
                "email": "  Priya@Example.com ",
                "password": "longenough1",
                "display_name": "Priya",
            })),
            None,
        )
        .await;
    assert_eq!(created.status(), 201);
    let session = response_json(created).await;
    assert_eq!(session["token_type"], "Bearer");
    assert_eq!(session["user"]["email"], "priya@example.com");
    assert_eq!(session["user"]["roles"], json!(["owner"]));

    let signed_in = app
        .request(
            Method::POST,
            "/auth/sign-in",
            Some(json!({"email": "priya@example.com", "password": "longenough1"})),
            None,
        )
        .await;
    assert_eq!(signed_in.status(), 200);
    let session = response_json(signed_in).await;
    let token = session["access_token"].as_str().unwrap().to_string();

    let flats = app
        .request(Method::GET, "/api/v1/flats", None, Some(&token))
        .await;
    assert_eq!(flats.status(), 200);
}

#[tokio::test]
async fn duplicate_email_and_bad_input() {
    let app = TestApp::new().await;

    let duplicate = app
        .request(
            Method::POST,
            "/auth/sign-up",
            Some(json!({"email": ADMIN_EMAIL.to_uppercase(), "password": "longenough1"})),
            None,
        )
        .await;
    assert_eq!(duplicate.status(), 409);
    let body = response_json(duplicate).await;
    assert_eq!(body["error"]["code"], "AUTH_EMAIL_TAKEN");

    let short_password = app
        .request(
            Method::POST,
            "/auth/sign-up",
            Some(json!({"email": "new@example.com", "password": "short"})),
            None,
        )
        .await;
    assert_eq!(short_password.status(), 400);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = TestApp::new().await;

    for (email, password) in [
        (ADMIN_EMAIL, "not-the-password"),
        ("nobody@example.com", PASSWORD),
    ] {
        let response = app
            .request(
                Method::POST,
                "/auth/sign-in",
                Some(json!({"email": email, "password": password})),
                None,
            )
            .await;
        assert_eq!(response.status(), 401);
        let body = response_json(response).await;
        assert_eq!(body["error"]["code"], "AUTH_INVALID_CREDENTIALS");
    }
}

#[tokio::test]
async fn session_reports_roles() {
    let app = TestApp::new().await;

    let admin = response_json(
        app.request(Method::GET, "/auth/session", None, Some(&app.admin_token))
            .await,
    )
    .await;
    assert_eq!(admin["user"]["email"], ADMIN_EMAIL);
    assert!(admin["user"]["roles"]
        .as_array()
        .unwrap()
        .contains(&json!("admin")));

    let owner = response_json(
        app.request(Method::GET, "/auth/session", None, Some(&app.owner_token))
            .await,
    )
    .await;
    assert_eq!(owner["user"]["roles"], json!(["owner"]));

    let anonymous = app.request(Method::GET, "/auth/session", None, None).await;
    assert_eq!(anonymous.status(), 401);
}

#[tokio::test]
async fn signed_out_tokens_are_rejected() {
    let app = TestApp::new().await;
    let token = app.owner_token.clone();

    let before = app
        .request(Method::GET, "/api/v1/flats", None, Some(&token))
        .await;
    assert_eq!(before.status(), 200);

    let signed_out = app
        .request(Method::POST, "/auth/sign-out", None, Some(&token))
        .await;
    assert_eq!(signed_out.status(), 200);

    let after = app
        .request(Method::GET, "/api/v1/flats", None, Some(&token))
        .await;
    assert_eq!(after.status(), 401);

    let session = app
        .request(Method::GET, "/auth/session", None, Some(&token))
        .await;
    assert_eq!(session.status(), 401);
    let body = response_json(session).await;
    assert_eq!(body["error"]["code"], "AUTH_REVOKED_TOKEN");
}

#[tokio::test]
async fn status_and_health_are_public() {
    let app = TestApp::new().await;

    let status = app.request(Method::GET, "/api/v1/status", None, None).await;
    assert_eq!(status.status(), 200);

    let health = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(health.status(), 200);
}
