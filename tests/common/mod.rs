#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{header, Method, Request},
    response::Response,
    Router,
};
use rentdesk_api::{
    auth::{AuthConfig, AuthService, SignUpRequest},
    config::AppConfig,
    db,
    events::{self, EventSender},
    handlers::AppServices,
    storage::{LocalObjectStore, ObjectStore},
    webhooks::SheetSyncClient,
    AppState,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;

pub const ADMIN_EMAIL: &str = "admin@rentdesk.test";
pub const OWNER_EMAIL: &str = "owner@rentdesk.test";
pub const PASSWORD: &str = "correct-horse-battery";

/// Helper harness: a file-backed SQLite database and a blob directory, both
/// inside a temp dir that lives as long as the app.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub admin_token: String,
    pub owner_token: String,
    _event_task: tokio::task::JoinHandle<()>,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::build(None).await
    }

    /// Same as [`TestApp::new`] but pushes created flats to `sync_endpoint`.
    pub async fn with_sync(sync_endpoint: &str) -> Self {
        Self::build(Some(sync_endpoint.to_string())).await
    }

    async fn build(sync_endpoint: Option<String>) -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let db_file = dir.path().join("rentdesk_test.db");
        let storage_root = dir.path().join("storage");
        std::fs::create_dir_all(&storage_root).expect("storage root");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_file.display()),
            "k8Vd2qLx9TzR4mNw7YbP1cJh6GsF3aEuQ0iKoWe5".to_string(),
            3600,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.admin_email = ADMIN_EMAIL.to_string();
        cfg.storage_root = storage_root.display().to_string();
        cfg.storage_public_base_url = "http://localhost:8080/storage".to_string();
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.sync_endpoint_url = sync_endpoint.clone();
        cfg.sync_api_key = sync_endpoint.as_ref().map(|_| "sync-test-key".to_string());

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");
        let db_arc = Arc::new(pool);

        let sync = sync_endpoint
            .map(|endpoint| SheetSyncClient::new(endpoint, "sync-test-key").expect("sync client"));
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx, sync));

        let object_store: Arc<dyn ObjectStore> = Arc::new(LocalObjectStore::new(
            &cfg.storage_root,
            &cfg.storage_public_base_url,
        ));
        let auth_service = Arc::new(AuthService::new(
            AuthConfig::from_app_config(&cfg),
            db_arc.clone(),
        ));
        let services = AppServices::new(
            db_arc.clone(),
            Arc::new(event_sender.clone()),
            object_store,
            &cfg.storage_bucket,
        );

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
            auth: auth_service.clone(),
        };
        let router = rentdesk_api::app_router(state.clone());

        let admin_token = sign_up(&auth_service, ADMIN_EMAIL, "Admin").await;
        let owner_token = sign_up(&auth_service, OWNER_EMAIL, "Owner").await;

        Self {
            router,
            state,
            admin_token,
            owner_token,
            _event_task: event_task,
            _dir: dir,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router response")
    }

    /// Request as the admin user.
    pub async fn request_authenticated(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response {
        let token = self.admin_token.clone();
        self.request(method, uri, body, Some(&token)).await
    }

    /// `multipart/form-data` POST with text fields and an optional `file` part.
    pub async fn upload(
        &self,
        uri: &str,
        fields: &[(&str, &str)],
        file: Option<(&str, &[u8])>,
        token: &str,
    ) -> Response {
        let boundary = "rentdesk-test-boundary";
        let mut payload: Vec<u8> = Vec::new();
        for (name, value) in fields {
            payload.extend_from_slice(
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((file_name, content)) = file {
            payload.extend_from_slice(
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            payload.extend_from_slice(content);
            payload.extend_from_slice(b"\r\n");
        }
        payload.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(payload))
            .expect("multipart request");

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router response")
    }

    /// Creates a flat through the API and returns its identifier.
    pub async fn create_flat(&self, apartment: &str, number: &str, rent: &str) -> String {
        let response = self
            .request_authenticated(
                Method::POST,
                "/api/v1/flats",
                Some(json!({
                    "apartment_name": apartment,
                    "flat_number": number,
                    "rent_amount": rent,
                })),
            )
            .await;
        assert_eq!(response.status(), 201, "flat creation should succeed");
        let body = response_json(response).await;
        body["data"]["flat_id"]
            .as_str()
            .expect("flat id")
            .to_string()
    }

    /// Moves a tenant into `flat_id` and returns the tenancy id.
    pub async fn create_tenancy(&self, flat_id: &str, tenant: &str, deposit: &str) -> String {
        let response = self
            .request_authenticated(
                Method::POST,
                "/api/v1/tenancies",
                Some(json!({
                    "flat_id": flat_id,
                    "tenant_name": tenant,
                    "deposit_amount": deposit,
                    "start_date": "2024-01-01",
                })),
            )
            .await;
        assert_eq!(response.status(), 201, "tenancy creation should succeed");
        let body = response_json(response).await;
        body["data"]["id"].as_str().expect("tenancy id").to_string()
    }

    pub fn storage_root(&self) -> std::path::PathBuf {
        std::path::PathBuf::from(&self.state.config.storage_root)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

async fn sign_up(auth: &AuthService, email: &str, name: &str) -> String {
    auth.sign_up(SignUpRequest {
        email: email.to_string(),
        password: PASSWORD.to_string(),
        display_name: Some(name.to_string()),
    })
    .await
    .expect("sign up test user")
    .access_token
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

/// Decimals are serialized as strings; compare them numerically.
pub fn decimal(value: &Value) -> rust_decimal::Decimal {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        Value::Number(n) => n.to_string().parse().expect("decimal number"),
        other => panic!("not a decimal: {other}"),
    }
}
