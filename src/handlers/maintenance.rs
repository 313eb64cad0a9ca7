use crate::{
    entities::maintenance_record,
    errors::ServiceError,
    services::maintenance::{
        CreateMaintenanceRequest, MaintenanceQuery, UpdateMaintenanceRequest,
        MAINTENANCE_CATEGORIES,
    },
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/api/v1/maintenance",
    params(MaintenanceQuery),
    responses((status = 200, description = "Maintenance records, newest first", body = ApiResponse<Vec<maintenance_record::Model>>)),
    security(("bearer_auth" = [])),
    tag = "maintenance"
)]
pub async fn list_maintenance(
    State(state): State<AppState>,
    Query(query): Query<MaintenanceQuery>,
) -> ApiResult<Vec<maintenance_record::Model>> {
    let records = state
        .services
        .maintenance
        .list(query.flat_id.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(records)))
}

#[utoipa::path(
    get,
    path = "/api/v1/maintenance/categories",
    responses((status = 200, description = "Suggested categories", body = ApiResponse<Vec<String>>)),
    security(("bearer_auth" = [])),
    tag = "maintenance"
)]
pub async fn list_categories() -> ApiResult<Vec<String>> {
    let categories = MAINTENANCE_CATEGORIES.iter().map(|c| c.to_string()).collect();
    Ok(Json(ApiResponse::success(categories)))
}

#[utoipa::path(
    post,
    path = "/api/v1/maintenance",
    request_body = CreateMaintenanceRequest,
    responses(
        (status = 201, description = "Record created", body = ApiResponse<maintenance_record::Model>),
        (status = 400, description = "Invalid record", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown flat or tenancy", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "maintenance"
)]
pub async fn create_maintenance(
    State(state): State<AppState>,
    Json(payload): Json<CreateMaintenanceRequest>,
) -> Result<(StatusCode, Json<ApiResponse<maintenance_record::Model>>), ServiceError> {
    let record = state.services.maintenance.create(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(record))))
}

#[utoipa::path(
    get,
    path = "/api/v1/maintenance/{id}",
    params(("id" = Uuid, Path, description = "Maintenance record id")),
    responses(
        (status = 200, description = "Record", body = ApiResponse<maintenance_record::Model>),
        (status = 404, description = "Unknown record", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "maintenance"
)]
pub async fn get_maintenance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<maintenance_record::Model> {
    let record = state.services.maintenance.get(id).await?;
    Ok(Json(ApiResponse::success(record)))
}

#[utoipa::path(
    put,
    path = "/api/v1/maintenance/{id}",
    params(("id" = Uuid, Path, description = "Maintenance record id")),
    request_body = UpdateMaintenanceRequest,
    responses(
        (status = 200, description = "Record updated", body = ApiResponse<maintenance_record::Model>),
        (status = 404, description = "Unknown record", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "maintenance"
)]
pub async fn update_maintenance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMaintenanceRequest>,
) -> ApiResult<maintenance_record::Model> {
    let record = state.services.maintenance.update(id, payload).await?;
    Ok(Json(ApiResponse::success(record)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/maintenance/{id}",
    params(("id" = Uuid, Path, description = "Maintenance record id")),
    responses(
        (status = 204, description = "Record deleted"),
        (status = 404, description = "Unknown record", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "maintenance"
)]
pub async fn delete_maintenance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.maintenance.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
