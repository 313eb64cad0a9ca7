use crate::{
    auth::AuthUser,
    commands::tenancies::{CreateTenancyCommand, EndTenancyCommand, UpdateTenancyRequest},
    entities::tenancy,
    errors::ServiceError,
    services::tenancies::{TenancyDocumentKind, TenancyQuery},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::common::read_multipart;

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct EndTenancyRequest {
    /// Defaults to today.
    pub end_date: Option<NaiveDate>,
    pub reason_for_exit: Option<String>,
}

type Created<T> = Result<(StatusCode, Json<ApiResponse<T>>), ServiceError>;

/// Tenant email and phone number are only returned to admins.
fn for_caller(tenancy: tenancy::Model, user: &AuthUser) -> tenancy::Model {
    tenancy.with_contact_visible(user.is_admin())
}

#[utoipa::path(
    get,
    path = "/api/v1/tenancies",
    params(TenancyQuery),
    responses((status = 200, description = "Tenancies, most recent first", body = ApiResponse<Vec<tenancy::Model>>)),
    security(("bearer_auth" = [])),
    tag = "tenancies"
)]
pub async fn list_tenancies(
    State(state): State<AppState>,
    Query(query): Query<TenancyQuery>,
    user: AuthUser,
) -> ApiResult<Vec<tenancy::Model>> {
    let tenancies = state
        .services
        .tenancies
        .list(&query)
        .await?
        .into_iter()
        .map(|t| for_caller(t, &user))
        .collect();
    Ok(Json(ApiResponse::success(tenancies)))
}

#[utoipa::path(
    post,
    path = "/api/v1/tenancies",
    request_body = CreateTenancyCommand,
    responses(
        (status = 201, description = "Tenant moved in", body = ApiResponse<tenancy::Model>),
        (status = 400, description = "Invalid tenancy", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown flat", body = crate::errors::ErrorResponse),
        (status = 409, description = "Flat already has an active tenant", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "tenancies"
)]
pub async fn create_tenancy(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateTenancyCommand>,
) -> Created<tenancy::Model> {
    let created = state.services.tenancies.create_active(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(for_caller(created, &user))),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/tenancies/past",
    request_body = CreateTenancyCommand,
    responses(
        (status = 201, description = "Past tenant recorded", body = ApiResponse<tenancy::Model>),
        (status = 400, description = "Invalid tenancy", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown flat", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "tenancies"
)]
pub async fn create_past_tenancy(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateTenancyCommand>,
) -> Created<tenancy::Model> {
    let created = state.services.tenancies.create_past(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(for_caller(created, &user))),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/tenancies/{id}",
    params(("id" = Uuid, Path, description = "Tenancy id")),
    responses(
        (status = 200, description = "Tenancy", body = ApiResponse<tenancy::Model>),
        (status = 404, description = "Unknown tenancy", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "tenancies"
)]
pub async fn get_tenancy(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> ApiResult<tenancy::Model> {
    let tenancy = state.services.tenancies.get(id).await?;
    Ok(Json(ApiResponse::success(for_caller(tenancy, &user))))
}

#[utoipa::path(
    put,
    path = "/api/v1/tenancies/{id}",
    params(("id" = Uuid, Path, description = "Tenancy id")),
    request_body = UpdateTenancyRequest,
    responses(
        (status = 200, description = "Tenancy updated", body = ApiResponse<tenancy::Model>),
        (status = 404, description = "Unknown tenancy", body = crate::errors::ErrorResponse),
        (status = 409, description = "Reactivation would give the flat two active tenants", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "tenancies"
)]
pub async fn update_tenancy(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
    Json(payload): Json<UpdateTenancyRequest>,
) -> ApiResult<tenancy::Model> {
    let updated = state.services.tenancies.update(id, payload).await?;
    Ok(Json(ApiResponse::success(for_caller(updated, &user))))
}

#[utoipa::path(
    post,
    path = "/api/v1/tenancies/{id}/end",
    params(("id" = Uuid, Path, description = "Tenancy id")),
    request_body = EndTenancyRequest,
    responses(
        (status = 200, description = "Tenancy ended", body = ApiResponse<tenancy::Model>),
        (status = 400, description = "Already ended or end date before start", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown tenancy", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "tenancies"
)]
pub async fn end_tenancy(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
    Json(payload): Json<EndTenancyRequest>,
) -> ApiResult<tenancy::Model> {
    let ended = state
        .services
        .tenancies
        .end(EndTenancyCommand {
            tenancy_id: id,
            end_date: payload.end_date,
            reason_for_exit: payload.reason_for_exit,
        })
        .await?;
    Ok(Json(ApiResponse::success(for_caller(ended, &user))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/tenancies/{id}",
    params(("id" = Uuid, Path, description = "Tenancy id")),
    responses(
        (status = 204, description = "Tenancy deleted"),
        (status = 404, description = "Unknown tenancy", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "tenancies"
)]
pub async fn delete_tenancy(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.tenancies.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Multipart fields: optional `kind` (`past_tenant_pdf` by default, or `aadhar`,
/// `pan`, `offer_letter`, `partner_aadhar`, `bachelor_aadhar`) and `file`.
#[utoipa::path(
    post,
    path = "/api/v1/tenancies/{id}/document",
    params(("id" = Uuid, Path, description = "Tenancy id")),
    request_body(content_type = "multipart/form-data", description = "`kind` and `file`"),
    responses(
        (status = 200, description = "File stored on the tenancy", body = ApiResponse<tenancy::Model>),
        (status = 400, description = "Unknown kind, empty file or non-PDF past tenant document", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown tenancy", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "tenancies"
)]
pub async fn upload_tenancy_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
    multipart: Multipart,
) -> ApiResult<tenancy::Model> {
    let mut form = read_multipart(multipart).await?;
    let kind = TenancyDocumentKind::parse(form.text("kind"))?;
    let file = form.take_file()?;

    let updated = state
        .services
        .tenancies
        .upload_document(id, kind, &file.file_name, file.content)
        .await?;
    Ok(Json(ApiResponse::success(for_caller(updated, &user))))
}
