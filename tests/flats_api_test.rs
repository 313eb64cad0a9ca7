mod common;

use axum::http::Method;
use common::{decimal, response_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::{json, Value};

fn flat_ids(body: &Value) -> Vec<String> {
    body["data"]
        .as_array()
        .expect("card list")
        .iter()
        .map(|card| card["flat_id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn flat_ids_are_slugs_and_duplicates_conflict() {
    let app = TestApp::new().await;

    let id = app.create_flat("Sunshine Towers", "101", "Rs 15,000").await;
    assert_eq!(id, "sunshine-towers-101");

    let response = app.request_authenticated(Method::GET, "/api/v1/flats/sunshine-towers-101", None).await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(decimal(&body["data"]["rent_amount"]), dec!(15000));
    assert_eq!(body["data"]["status"], "unpaid");
    assert_eq!(body["data"]["owner_email"], common::ADMIN_EMAIL);

    let duplicate = app
        .request_authenticated(
            Method::POST,
            "/api/v1/flats",
            Some(json!({"apartment_name": "sunshine towers", "flat_number": "101", "rent_amount": 1})),
        )
        .await;
    assert_eq!(duplicate.status(), 409);
}

#[tokio::test]
async fn blank_apartment_name_is_rejected() {
    let app = TestApp::new().await;
    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/flats",
            Some(json!({"apartment_name": "   ", "rent_amount": "1000"})),
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn dashboard_filters_by_occupancy_and_search() {
    let app = TestApp::new().await;
    let sunny = app.create_flat("Sunshine Towers", "101", "15000").await;
    app.create_flat("Sunshine Towers", "102", "15000").await;
    app.create_flat("Palm Court", "C-203", "12000").await;
    app.create_tenancy(&sunny, "Asha Rao", "30000").await;

    let all = response_json(app.request_authenticated(Method::GET, "/api/v1/flats", None).await).await;
    assert_eq!(flat_ids(&all).len(), 3);

    let filled = response_json(
        app.request_authenticated(Method::GET, "/api/v1/flats?filter=filled", None)
            .await,
    )
    .await;
    assert_eq!(flat_ids(&filled), vec![sunny.clone()]);
    assert_eq!(filled["data"][0]["tenant_names"], json!(["Asha Rao"]));
    assert_eq!(filled["data"][0]["occupied"], true);

    let vacant = response_json(
        app.request_authenticated(Method::GET, "/api/v1/flats?filter=vacant", None)
            .await,
    )
    .await;
    let vacant_ids = flat_ids(&vacant);
    assert_eq!(vacant_ids.len(), 2);
    assert!(!vacant_ids.contains(&sunny));

    let searched = response_json(
        app.request_authenticated(Method::GET, "/api/v1/flats?search=SUN", None)
            .await,
    )
    .await;
    assert_eq!(
        flat_ids(&searched),
        vec!["sunshine-towers-101".to_string(), "sunshine-towers-102".to_string()]
    );

    let by_tenant = response_json(
        app.request_authenticated(Method::GET, "/api/v1/flats?filter=filled&search=asha", None)
            .await,
    )
    .await;
    assert_eq!(flat_ids(&by_tenant), vec![sunny]);

    let nothing = response_json(
        app.request_authenticated(Method::GET, "/api/v1/flats?filter=vacant&search=asha", None)
            .await,
    )
    .await;
    assert!(flat_ids(&nothing).is_empty());
}

#[tokio::test]
async fn detail_groups_tenancies_maintenance_and_documents() {
    let app = TestApp::new().await;
    let flat_id = app.create_flat("Palm Court", "C-203", "12000").await;
    app.create_tenancy(&flat_id, "Vikram Shah", "24000").await;

    let past = app
        .request_authenticated(
            Method::POST,
            "/api/v1/tenancies/past",
            Some(json!({
                "flat_id": flat_id,
                "tenant_name": "Old Tenant",
                "deposit_amount": "10000",
                "start_date": "2021-04-01",
                "end_date": "2023-03-31",
            })),
        )
        .await;
    assert_eq!(past.status(), 201);

    let maintenance = app
        .request_authenticated(
            Method::POST,
            "/api/v1/maintenance",
            Some(json!({
                "flat_id": flat_id,
                "category": "Plumbing",
                "description": "Kitchen sink leaking",
                "cost": "Rs 1,200",
            })),
        )
        .await;
    assert_eq!(maintenance.status(), 201);
    let record = response_json(maintenance).await;
    assert_eq!(record["data"]["severity"], "low");
    assert_eq!(decimal(&record["data"]["cost"]), dec!(1200));

    let response = app
        .request_authenticated(Method::GET, &format!("/api/v1/flats/{}/detail", flat_id), None)
        .await;
    assert_eq!(response.status(), 200);
    let detail = response_json(response).await;
    assert_eq!(detail["data"]["active_tenancy"]["tenant_name"], "Vikram Shah");
    assert_eq!(detail["data"]["past_tenancies"].as_array().unwrap().len(), 1);
    assert_eq!(detail["data"]["past_tenancies"][0]["tenant_name"], "Old Tenant");
    assert_eq!(detail["data"]["maintenance"].as_array().unwrap().len(), 1);
    assert!(detail["data"]["documents"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn update_and_delete_flat_cascades() {
    let app = TestApp::new().await;
    let flat_id = app.create_flat("Lake View", "7", "9000").await;
    let tenancy_id = app.create_tenancy(&flat_id, "Meera", "18000").await;

    let updated = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/v1/flats/{}", flat_id),
            Some(json!({"rent_amount": "9,500", "due_date": "2024-02-05"})),
        )
        .await;
    assert_eq!(updated.status(), 200);
    let body = response_json(updated).await;
    assert_eq!(decimal(&body["data"]["rent_amount"]), dec!(9500));
    assert_eq!(body["data"]["due_date"], "2024-02-05");

    let deleted = app
        .request_authenticated(Method::DELETE, &format!("/api/v1/flats/{}", flat_id), None)
        .await;
    assert_eq!(deleted.status(), 204);

    let flat = app
        .request_authenticated(Method::GET, &format!("/api/v1/flats/{}", flat_id), None)
        .await;
    assert_eq!(flat.status(), 404);
    let tenancy = app
        .request_authenticated(Method::GET, &format!("/api/v1/tenancies/{}", tenancy_id), None)
        .await;
    assert_eq!(tenancy.status(), 404);
}

#[tokio::test]
async fn flats_require_a_token() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/api/v1/flats", None, None).await;
    assert_eq!(response.status(), 401);

    let response = app
        .request(Method::GET, "/api/v1/flats", None, Some("not-a-jwt"))
        .await;
    assert_eq!(response.status(), 401);
}
