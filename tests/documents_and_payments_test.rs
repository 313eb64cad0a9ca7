mod common;

use axum::http::Method;
use common::{response_json, TestApp};
use serde_json::json;

#[tokio::test]
async fn paid_without_a_date_is_rejected_and_nothing_changes() {
    let app = TestApp::new().await;
    let flat_id = app.create_flat("Sunshine Towers", "101", "15000").await;
    let uri = format!("/api/v1/flats/{}/payment", flat_id);

    let rejected = app
        .request_authenticated(Method::PUT, &uri, Some(json!({"status": "paid"})))
        .await;
    assert_eq!(rejected.status(), 400);

    let flat = response_json(
        app.request_authenticated(Method::GET, &format!("/api/v1/flats/{}", flat_id), None)
            .await,
    )
    .await;
    assert_eq!(flat["data"]["status"], "unpaid");
    assert!(flat["data"]["paid_on"].is_null());
}

#[tokio::test]
async fn payment_dates_accept_both_layouts_and_unpaid_clears() {
    let app = TestApp::new().await;
    let flat_id = app.create_flat("Palm Court", "C-203", "12000").await;
    let uri = format!("/api/v1/flats/{}/payment", flat_id);

    let paid = response_json(
        app.request_authenticated(
            Method::PUT,
            &uri,
            Some(json!({"status": "paid", "paid_on": "05-03-2024"})),
        )
        .await,
    )
    .await;
    assert_eq!(paid["data"]["status"], "paid");
    assert_eq!(paid["data"]["paid_on"], "2024-03-05");

    let bad = app
        .request_authenticated(
            Method::PUT,
            &uri,
            Some(json!({"status": "paid", "paid_on": "March 5th"})),
        )
        .await;
    assert_eq!(bad.status(), 400);

    let unpaid = response_json(
        app.request_authenticated(Method::PUT, &uri, Some(json!({"status": "unpaid"})))
            .await,
    )
    .await;
    assert_eq!(unpaid["data"]["status"], "unpaid");
    assert!(unpaid["data"]["paid_on"].is_null());
}

#[tokio::test]
async fn payment_proof_is_filed_under_its_month() {
    let app = TestApp::new().await;
    let flat_id = app.create_flat("Lake View", "7", "9000").await;
    let uri = format!("/api/v1/flats/{}/payment-proof", flat_id);

    let missing_date = app
        .upload(&uri, &[], Some(("receipt.png", &b"png-bytes"[..])), &app.owner_token)
        .await;
    assert_eq!(missing_date.status(), 400);

    let response = app
        .upload(
            &uri,
            &[("paid_on", "2024-04-02")],
            Some(("receipt.png", &b"png-bytes"[..])),
            &app.owner_token,
        )
        .await;
    assert_eq!(response.status(), 201);
    let body = response_json(response).await;
    assert_eq!(body["data"]["flat"]["status"], "paid");
    assert_eq!(body["data"]["flat"]["paid_on"], "2024-04-02");
    assert_eq!(body["data"]["document"]["type"], "payment");
    assert_eq!(body["data"]["document"]["month"], "2024-04");
    assert_eq!(body["data"]["document"]["uploaded_by"], common::OWNER_EMAIL);
    let url = body["data"]["document"]["file_url"].as_str().unwrap();
    assert!(url.starts_with("http://localhost:8080/storage/tenant-docs/payments/lake-view-7_"));
    assert!(url.ends_with("_receipt.png"));
}

#[tokio::test]
async fn only_admins_upload_flat_documents() {
    let app = TestApp::new().await;
    let flat_id = app.create_flat("Sunshine Towers", "101", "15000").await;
    let uri = format!("/api/v1/flats/{}/documents", flat_id);
    let fields = [("type", "agreement"), ("month", "2024-01")];
    let file = Some(("lease.pdf", &b"%PDF-1.4 lease"[..]));

    let forbidden = app.upload(&uri, &fields, file, &app.owner_token).await;
    assert_eq!(forbidden.status(), 403);

    // Owners can still read the list.
    let listed = app
        .request(Method::GET, &uri, None, Some(&app.owner_token))
        .await;
    assert_eq!(listed.status(), 200);

    let created = app.upload(&uri, &fields, file, &app.admin_token).await;
    assert_eq!(created.status(), 201);
    let body = response_json(created).await;
    assert_eq!(body["data"]["type"], "agreement");
    assert_eq!(body["data"]["month"], "2024-01");
    assert!(body["data"]["file_url"]
        .as_str()
        .unwrap()
        .contains("/tenant-docs/rental-agreements/sunshine-towers-101_"));
}

#[tokio::test]
async fn document_uploads_validate_type_and_month() {
    let app = TestApp::new().await;
    let flat_id = app.create_flat("Palm Court", "C-205", "12000").await;
    let uri = format!("/api/v1/flats/{}/documents", flat_id);
    let file = Some(("x.pdf", &b"%PDF"[..]));

    let bad_type = app
        .upload(&uri, &[("type", "invoice")], file, &app.admin_token)
        .await;
    assert_eq!(bad_type.status(), 400);

    let bad_month = app
        .upload(&uri, &[("type", "payment"), ("month", "03-2024")], file, &app.admin_token)
        .await;
    assert_eq!(bad_month.status(), 400);

    let no_file = app
        .upload(&uri, &[("type", "agreement")], None, &app.admin_token)
        .await;
    assert_eq!(no_file.status(), 400);

    let unknown_flat = app
        .upload(
            "/api/v1/flats/nowhere-1/documents",
            &[("type", "agreement")],
            file,
            &app.admin_token,
        )
        .await;
    assert_eq!(unknown_flat.status(), 404);
}

#[tokio::test]
async fn updating_and_deleting_documents_touches_the_blob() {
    let app = TestApp::new().await;
    let flat_id = app.create_flat("Lake View", "9", "9000").await;
    let created = response_json(
        app.upload(
            &format!("/api/v1/flats/{}/documents", flat_id),
            &[("type", "payment"), ("month", "2024-02")],
            Some(("proof.jpg", &b"jpeg"[..])),
            &app.admin_token,
        )
        .await,
    )
    .await;
    let id = created["data"]["id"].as_str().unwrap().to_string();
    let url = created["data"]["file_url"].as_str().unwrap().to_string();
    let blob = app
        .storage_root()
        .join(url.strip_prefix("http://localhost:8080/storage/").unwrap());
    assert!(blob.exists());

    let updated = response_json(
        app.request_authenticated(
            Method::PUT,
            &format!("/api/v1/documents/{}", id),
            Some(json!({"type": "agreement", "month": ""})),
        )
        .await,
    )
    .await;
    assert_eq!(updated["data"]["type"], "agreement");
    assert!(updated["data"]["month"].is_null());

    let deleted = app
        .request_authenticated(Method::DELETE, &format!("/api/v1/documents/{}", id), None)
        .await;
    assert_eq!(deleted.status(), 204);
    assert!(!blob.exists());

    let listed = response_json(
        app.request_authenticated(
            Method::GET,
            &format!("/api/v1/flats/{}/documents", flat_id),
            None,
        )
        .await,
    )
    .await;
    assert!(listed["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn generic_storage_upload_and_delete() {
    let app = TestApp::new().await;

    let response = app
        .upload(
            "/api/v1/storage/tenant-docs",
            &[("folder", "work-docs"), ("owner", "palm-court-c-203")],
            Some(("offer letter.pdf", &b"%PDF"[..])),
            &app.owner_token,
        )
        .await;
    assert_eq!(response.status(), 201);
    let body = response_json(response).await;
    let path = body["data"]["path"].as_str().unwrap().to_string();
    assert!(path.starts_with("work-docs/palm-court-c-203_"));
    assert!(path.ends_with("_offer_letter.pdf"));
    assert!(app.storage_root().join("tenant-docs").join(&path).exists());

    let deleted = app
        .request(
            Method::DELETE,
            &format!("/api/v1/storage/tenant-docs/{}", path),
            None,
            Some(&app.owner_token),
        )
        .await;
    assert_eq!(deleted.status(), 204);
    assert!(!app.storage_root().join("tenant-docs").join(&path).exists());
}
