use crate::{
    errors::ServiceError,
    storage::{timestamped_path, BucketHandle},
    ApiResponse, AppState,
};
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::common::read_multipart;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadedObject {
    pub bucket: String,
    pub path: String,
    pub public_url: String,
}

/// Multipart fields: `file`, optional `folder` and optional `owner` used in the object name.
#[utoipa::path(
    post,
    path = "/api/v1/storage/{bucket}",
    params(("bucket" = String, Path, description = "Bucket name")),
    request_body(content_type = "multipart/form-data", description = "`file`, `folder` and `owner`"),
    responses(
        (status = 201, description = "Object stored", body = ApiResponse<UploadedObject>),
        (status = 400, description = "Missing file or invalid bucket", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "storage"
)]
pub async fn upload_object(
    State(state): State<AppState>,
    Path(bucket): Path<String>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<UploadedObject>>), ServiceError> {
    let mut form = read_multipart(multipart).await?;
    let folder = form.text("folder").unwrap_or("uploads").to_string();
    let owner = form.text("owner").unwrap_or("file").to_string();
    let file = form.take_file()?;
    if file.content.is_empty() {
        return Err(ServiceError::ValidationError("file is empty".to_string()));
    }

    let handle = BucketHandle::new(state.services.storage.clone(), bucket.clone());
    let path = timestamped_path(&folder, &owner, &file.file_name);
    let stored = handle.put(&path, file.content).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(UploadedObject {
            bucket,
            path: stored.path,
            public_url: stored.public_url,
        })),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/storage/{bucket}/{path}",
    params(
        ("bucket" = String, Path, description = "Bucket name"),
        ("path" = String, Path, description = "Object path inside the bucket")
    ),
    responses(
        (status = 204, description = "Object removed (or already absent)"),
        (status = 400, description = "Invalid path", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "storage"
)]
pub async fn delete_object(
    State(state): State<AppState>,
    Path((bucket, path)): Path<(String, String)>,
) -> Result<StatusCode, ServiceError> {
    state
        .services
        .storage
        .remove(&bucket, &[path.trim_start_matches('/').to_string()])
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
