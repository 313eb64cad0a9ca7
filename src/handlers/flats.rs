use crate::{
    auth::AuthUser,
    commands::flats::{CreateFlatCommand, PaymentStatus},
    entities::flat,
    errors::ServiceError,
    services::{
        flats::{DashboardQuery, FlatDetail, UpdateFlatRequest},
        payments::PaymentProofOutcome,
        FlatCard,
    },
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::common::read_multipart;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdatePaymentRequest {
    pub status: PaymentStatus,
    /// Required for `paid`: `YYYY-MM-DD` or `DD-MM-YYYY`
    pub paid_on: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/flats",
    params(DashboardQuery),
    responses(
        (status = 200, description = "Dashboard cards", body = ApiResponse<Vec<FlatCard>>),
        (status = 401, description = "Not signed in", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "flats"
)]
pub async fn list_flats(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> ApiResult<Vec<FlatCard>> {
    let cards = state.services.flats.dashboard(&query).await?;
    Ok(Json(ApiResponse::success(cards)))
}

#[utoipa::path(
    post,
    path = "/api/v1/flats",
    request_body = CreateFlatCommand,
    responses(
        (status = 201, description = "Flat created", body = ApiResponse<flat::Model>),
        (status = 400, description = "Invalid flat", body = crate::errors::ErrorResponse),
        (status = 409, description = "Flat id already taken", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "flats"
)]
pub async fn create_flat(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateFlatCommand>,
) -> Result<(StatusCode, Json<ApiResponse<flat::Model>>), ServiceError> {
    let created = state.services.flats.create_flat(payload, &user.email).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

#[utoipa::path(
    get,
    path = "/api/v1/flats/{flat_id}",
    params(("flat_id" = String, Path, description = "Flat identifier")),
    responses(
        (status = 200, description = "Flat", body = ApiResponse<flat::Model>),
        (status = 404, description = "Unknown flat", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "flats"
)]
pub async fn get_flat(
    State(state): State<AppState>,
    Path(flat_id): Path<String>,
) -> ApiResult<flat::Model> {
    let flat = state.services.flats.get_flat(&flat_id).await?;
    Ok(Json(ApiResponse::success(flat)))
}

#[utoipa::path(
    put,
    path = "/api/v1/flats/{flat_id}",
    params(("flat_id" = String, Path, description = "Flat identifier")),
    request_body = UpdateFlatRequest,
    responses(
        (status = 200, description = "Flat updated", body = ApiResponse<flat::Model>),
        (status = 404, description = "Unknown flat", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "flats"
)]
pub async fn update_flat(
    State(state): State<AppState>,
    Path(flat_id): Path<String>,
    Json(payload): Json<UpdateFlatRequest>,
) -> ApiResult<flat::Model> {
    let updated = state.services.flats.update_flat(&flat_id, payload).await?;
    Ok(Json(ApiResponse::success(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/flats/{flat_id}",
    params(("flat_id" = String, Path, description = "Flat identifier")),
    responses(
        (status = 204, description = "Flat and its rows deleted"),
        (status = 404, description = "Unknown flat", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "flats"
)]
pub async fn delete_flat(
    State(state): State<AppState>,
    Path(flat_id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    state.services.flats.delete_flat(&flat_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/flats/{flat_id}/detail",
    params(("flat_id" = String, Path, description = "Flat identifier")),
    responses(
        (status = 200, description = "Flat with tenants, maintenance and documents; tenant email and phone are admin-only", body = ApiResponse<FlatDetail>),
        (status = 404, description = "Unknown flat", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "flats"
)]
pub async fn flat_detail(
    State(state): State<AppState>,
    Path(flat_id): Path<String>,
    user: AuthUser,
) -> ApiResult<FlatDetail> {
    let detail = state.services.flats.flat_detail(&flat_id).await?;
    Ok(Json(ApiResponse::success(
        detail.with_contact_visible(user.is_admin()),
    )))
}

#[utoipa::path(
    put,
    path = "/api/v1/flats/{flat_id}/payment",
    params(("flat_id" = String, Path, description = "Flat identifier")),
    request_body = UpdatePaymentRequest,
    responses(
        (status = 200, description = "Payment status stored", body = ApiResponse<flat::Model>),
        (status = 400, description = "Paid without a valid date", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown flat", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "payments"
)]
pub async fn update_payment(
    State(state): State<AppState>,
    Path(flat_id): Path<String>,
    Json(payload): Json<UpdatePaymentRequest>,
) -> ApiResult<flat::Model> {
    let flat = state
        .services
        .payments
        .set_status(&flat_id, payload.status, payload.paid_on)
        .await?;
    Ok(Json(ApiResponse::success(flat)))
}

/// Multipart fields: `paid_on` and `file`.
#[utoipa::path(
    post,
    path = "/api/v1/flats/{flat_id}/payment-proof",
    params(("flat_id" = String, Path, description = "Flat identifier")),
    request_body(content_type = "multipart/form-data", description = "`paid_on` and `file`"),
    responses(
        (status = 201, description = "Proof stored and flat marked paid", body = ApiResponse<PaymentProofOutcome>),
        (status = 400, description = "Missing date or file", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown flat", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "payments"
)]
pub async fn upload_payment_proof(
    State(state): State<AppState>,
    Path(flat_id): Path<String>,
    user: AuthUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<PaymentProofOutcome>>), ServiceError> {
    let mut form = read_multipart(multipart).await?;
    let paid_on = form.require_text("paid_on")?.to_string();
    let file = form.take_file()?;

    let outcome = state
        .services
        .payments
        .record_payment_proof(&flat_id, &paid_on, &file.file_name, file.content, &user.email)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(outcome))))
}
