use crate::{
    auth::AuthUser,
    entities::rental_document,
    errors::ServiceError,
    services::documents::{DocumentUpload, UpdateDocumentRequest},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;

use super::common::read_multipart;

#[utoipa::path(
    get,
    path = "/api/v1/flats/{flat_id}/documents",
    params(("flat_id" = String, Path, description = "Flat identifier")),
    responses(
        (status = 200, description = "Documents, newest first", body = ApiResponse<Vec<rental_document::Model>>),
        (status = 404, description = "Unknown flat", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "documents"
)]
pub async fn list_flat_documents(
    State(state): State<AppState>,
    Path(flat_id): Path<String>,
) -> ApiResult<Vec<rental_document::Model>> {
    let documents = state.services.documents.list_for_flat(&flat_id).await?;
    Ok(Json(ApiResponse::success(documents)))
}

/// Multipart fields: `type`, optional `month` (`YYYY-MM`), optional `tenant_id`, `file`.
#[utoipa::path(
    post,
    path = "/api/v1/flats/{flat_id}/documents",
    params(("flat_id" = String, Path, description = "Flat identifier")),
    request_body(content_type = "multipart/form-data", description = "`type`, `month`, `tenant_id` and `file`"),
    responses(
        (status = 201, description = "Document stored", body = ApiResponse<rental_document::Model>),
        (status = 400, description = "Invalid type, month or file", body = crate::errors::ErrorResponse),
        (status = 403, description = "Admins only"),
        (status = 404, description = "Unknown flat", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "documents"
)]
pub async fn upload_flat_document(
    State(state): State<AppState>,
    Path(flat_id): Path<String>,
    user: AuthUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<rental_document::Model>>), ServiceError> {
    let mut form = read_multipart(multipart).await?;
    let doc_type = form.require_text("type")?.to_string();
    let month = form.text("month").map(str::to_string);
    let tenant_id = form
        .text("tenant_id")
        .map(|raw| {
            Uuid::parse_str(raw)
                .map_err(|_| ServiceError::ValidationError(format!("invalid tenant_id '{}'", raw)))
        })
        .transpose()?;
    let file = form.take_file()?;

    let upload = DocumentUpload {
        doc_type,
        month,
        tenant_id,
        file_name: file.file_name,
        content: file.content,
    };
    let document = state
        .services
        .documents
        .upload_for_flat(&flat_id, upload, &user.email)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(document))))
}

#[utoipa::path(
    put,
    path = "/api/v1/documents/{id}",
    params(("id" = Uuid, Path, description = "Document id")),
    request_body = UpdateDocumentRequest,
    responses(
        (status = 200, description = "Document updated", body = ApiResponse<rental_document::Model>),
        (status = 404, description = "Unknown document", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "documents"
)]
pub async fn update_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDocumentRequest>,
) -> ApiResult<rental_document::Model> {
    let document = state.services.documents.update(id, payload).await?;
    Ok(Json(ApiResponse::success(document)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/documents/{id}",
    params(("id" = Uuid, Path, description = "Document id")),
    responses(
        (status = 204, description = "Row and blob removed"),
        (status = 404, description = "Unknown document", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "documents"
)]
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.documents.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
