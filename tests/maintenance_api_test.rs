mod common;

use axum::http::Method;
use common::{decimal, response_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn maintenance_records_round_the_flat() {
    let app = TestApp::new().await;
    let sunny = app.create_flat("Sunshine Towers", "101", "15000").await;
    let palm = app.create_flat("Palm Court", "C-203", "12000").await;
    let tenancy_id = app.create_tenancy(&sunny, "Asha Rao", "30000").await;

    let created = app
        .request_authenticated(
            Method::POST,
            "/api/v1/maintenance",
            Some(json!({
                "flat_id": sunny,
                "tenancy_id": tenancy_id,
                "category": "Electrical",
                "description": "Bedroom switchboard sparks",
                "severity": "High",
                "cost": 800,
            })),
        )
        .await;
    assert_eq!(created.status(), 201);
    let record = response_json(created).await;
    assert_eq!(record["data"]["severity"], "high");
    let id = record["data"]["id"].as_str().unwrap().to_string();

    // A tenancy from another flat cannot be attached.
    let mismatched = app
        .request_authenticated(
            Method::POST,
            "/api/v1/maintenance",
            Some(json!({
                "flat_id": palm,
                "tenancy_id": tenancy_id,
                "category": "Plumbing",
                "description": "Leak",
            })),
        )
        .await;
    assert_eq!(mismatched.status(), 400);

    let bad_severity = app
        .request_authenticated(
            Method::POST,
            "/api/v1/maintenance",
            Some(json!({
                "flat_id": palm,
                "category": "Plumbing",
                "description": "Leak",
                "severity": "urgent",
            })),
        )
        .await;
    assert_eq!(bad_severity.status(), 400);

    let free_text = app
        .request_authenticated(
            Method::POST,
            "/api/v1/maintenance",
            Some(json!({"flat_id": palm, "category": "Balcony grill", "description": "Rusted"})),
        )
        .await;
    assert_eq!(free_text.status(), 201);

    let for_sunny = response_json(
        app.request_authenticated(
            Method::GET,
            &format!("/api/v1/maintenance?flat_id={}", sunny),
            None,
        )
        .await,
    )
    .await;
    assert_eq!(for_sunny["data"].as_array().unwrap().len(), 1);

    let updated = response_json(
        app.request_authenticated(
            Method::PUT,
            &format!("/api/v1/maintenance/{}", id),
            Some(json!({"cost": "Rs 1,250", "severity": "medium"})),
        )
        .await,
    )
    .await;
    assert_eq!(decimal(&updated["data"]["cost"]), dec!(1250));
    assert_eq!(updated["data"]["severity"], "medium");

    let deleted = app
        .request_authenticated(Method::DELETE, &format!("/api/v1/maintenance/{}", id), None)
        .await;
    assert_eq!(deleted.status(), 204);
    let gone = app
        .request_authenticated(Method::GET, &format!("/api/v1/maintenance/{}", id), None)
        .await;
    assert_eq!(gone.status(), 404);
}

#[tokio::test]
async fn categories_are_listed() {
    let app = TestApp::new().await;
    let body = response_json(
        app.request_authenticated(Method::GET, "/api/v1/maintenance/categories", None)
            .await,
    )
    .await;
    let categories = body["data"].as_array().unwrap();
    assert!(categories.contains(&json!("Plumbing")));
    assert!(categories.contains(&json!("Pest Control")));
}
