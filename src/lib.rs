//! RentDesk API Library
//!
//! Property-management backend: flats, tenancies, maintenance history,
//! rental documents, rent status and tenant exit settlements.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod commands;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod reports;
pub mod services;
pub mod storage;
pub mod tracing;
pub mod webhooks;

use axum::{
    extract::{DefaultBodyLimit, State},
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::services::ServeDir;
use utoipa::ToSchema;

use crate::auth::{AuthRouterExt, AuthService, ROLE_ADMIN};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
    pub auth: Arc<AuthService>,
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }
}


/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Every `/api/v1` route. All of them require a bearer token; uploading flat
/// documents additionally requires the admin role.
pub fn api_v1_routes() -> Router<AppState> {
    let flats = Router::new()
        .route(
            "/flats",
            get(handlers::flats::list_flats).post(handlers::flats::create_flat),
        )
        .route(
            "/flats/:flat_id",
            get(handlers::flats::get_flat)
                .put(handlers::flats::update_flat)
                .delete(handlers::flats::delete_flat),
        )
        .route("/flats/:flat_id/detail", get(handlers::flats::flat_detail))
        .route("/flats/:flat_id/payment", put(handlers::flats::update_payment))
        .route(
            "/flats/:flat_id/payment-proof",
            post(handlers::flats::upload_payment_proof),
        )
        .route(
            "/flats/:flat_id/documents",
            get(handlers::documents::list_flat_documents),
        );

    let flat_documents_admin = Router::new()
        .route(
            "/flats/:flat_id/documents",
            post(handlers::documents::upload_flat_document),
        )
        .with_role(ROLE_ADMIN);

    let tenancies = Router::new()
        .route(
            "/tenancies",
            get(handlers::tenancies::list_tenancies).post(handlers::tenancies::create_tenancy),
        )
        .route(
            "/tenancies/past",
            post(handlers::tenancies::create_past_tenancy),
        )
        .route(
            "/tenancies/:id",
            get(handlers::tenancies::get_tenancy)
                .put(handlers::tenancies::update_tenancy)
                .delete(handlers::tenancies::delete_tenancy),
        )
        .route("/tenancies/:id/end", post(handlers::tenancies::end_tenancy))
        .route(
            "/tenancies/:id/document",
            post(handlers::tenancies::upload_tenancy_document),
        );

    let maintenance = Router::new()
        .route(
            "/maintenance",
            get(handlers::maintenance::list_maintenance)
                .post(handlers::maintenance::create_maintenance),
        )
        .route(
            "/maintenance/categories",
            get(handlers::maintenance::list_categories),
        )
        .route(
            "/maintenance/:id",
            get(handlers::maintenance::get_maintenance)
                .put(handlers::maintenance::update_maintenance)
                .delete(handlers::maintenance::delete_maintenance),
        );

    let documents = Router::new().route(
        "/documents/:id",
        put(handlers::documents::update_document).delete(handlers::documents::delete_document),
    );

    let settlements = Router::new()
        .route(
            "/settlements/quote",
            post(handlers::settlements::quote_settlement),
        )
        .route("/settlements/pdf", post(handlers::settlements::settlement_pdf))
        .route(
            "/settlements/finalize",
            post(handlers::settlements::finalize_settlement),
        );

    let storage = Router::new()
        .route("/storage/:bucket", post(handlers::storage::upload_object))
        .route(
            "/storage/:bucket/*path",
            delete(handlers::storage::delete_object),
        );

    let authenticated = Router::new()
        .merge(flats)
        .merge(tenancies)
        .merge(maintenance)
        .merge(documents)
        .merge(settlements)
        .merge(storage)
        .with_auth();

    Router::new()
        .route("/status", get(api_status))
        .merge(authenticated)
        .merge(flat_documents_admin)
}

/// Full application router: `/api/v1`, `/auth`, `/health`, Swagger UI and the
/// read-only blob mount at `/storage`. CORS and compression are left to the binary.
pub fn app_router(state: AppState) -> Router {
    let auth_service = state.auth.clone();
    let upload_limit = state.config.max_upload_bytes;
    let blobs = ServeDir::new(&state.config.storage_root);

    Router::<AppState>::new()
        .route("/health", get(health_check))
        .nest(
            "/api/v1",
            api_v1_routes().layer(DefaultBodyLimit::max(upload_limit)),
        )
        .nest("/auth", auth::auth_routes().with_state(auth_service.clone()))
        .nest_service("/storage", blobs)
        .merge(openapi::swagger_ui())
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        // Inject AuthService into request extensions for auth middleware
        .layer(axum::middleware::from_fn_with_state(
            auth_service,
            |State(auth): State<Arc<AuthService>>,
             mut req: axum::extract::Request,
             next: axum::middleware::Next| async move {
                req.extensions_mut().insert(auth);
                next.run(req).await
            },
        ))
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}

async fn api_status(State(state): State<AppState>) -> ApiResult<Value> {
    let status_data = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "rentdesk-api",
        "timestamp": Utc::now().to_rfc3339(),
        "environment": state.config.environment,
        "sync_enabled": state.config.sync_target().is_some(),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(State(state): State<AppState>) -> ApiResult<Value> {
    let db_status = match db::check_connection(&state.db).await {
        Ok(()) => "healthy",
        Err(_) => "unhealthy",
    };
    let storage_status = match tokio::fs::metadata(&state.config.storage_root).await {
        Ok(meta) if meta.is_dir() => "healthy",
        _ => "unhealthy",
    };

    if db_status != "healthy" {
        ::tracing::warn!("health check: database unreachable");
    }

    let health_data = json!({
        "status": if db_status == "healthy" && storage_status == "healthy" { "healthy" } else { "unhealthy" },
        "checks": {
            "database": db_status,
            "storage": storage_status,
        },
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}
