//! Tenant exit settlement: quote the refund, download the summary PDF,
//! or finalize (file the PDF and end the tenancy).

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    services::settlement::{
        FinalizeOutcome, FinalizeSettlementRequest, SettlementQuote, SettlementRequest,
    },
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::{IntoResponse, Json, Response},
};

#[utoipa::path(
    post,
    path = "/api/v1/settlements/quote",
    request_body = SettlementRequest,
    responses(
        (status = 200, description = "Refund breakdown", body = ApiResponse<SettlementQuote>),
        (status = 400, description = "Missing tenancy id or inactive tenancy", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown tenancy", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "settlements"
)]
pub async fn quote_settlement(
    State(state): State<AppState>,
    Json(payload): Json<SettlementRequest>,
) -> ApiResult<SettlementQuote> {
    let quote = state.services.settlement.quote(&payload).await?;
    Ok(Json(ApiResponse::success(quote)))
}

#[utoipa::path(
    post,
    path = "/api/v1/settlements/pdf",
    request_body = SettlementRequest,
    responses(
        (status = 200, description = "Exit summary", content_type = "application/pdf", body = Vec<u8>),
        (status = 400, description = "Missing tenancy id or inactive tenancy", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown tenancy", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "settlements"
)]
pub async fn settlement_pdf(
    State(state): State<AppState>,
    Json(payload): Json<SettlementRequest>,
) -> Result<Response, ServiceError> {
    let rendered = state.services.settlement.render(&payload).await?;

    // Quotes and backslashes would end the quoted filename early.
    let file_name = rendered.file_name.replace(['"', '\\'], "_");
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", file_name))
        .map_err(|e| ServiceError::InternalError(format!("bad content disposition: {}", e)))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        rendered.bytes,
    )
        .into_response())
}

#[utoipa::path(
    post,
    path = "/api/v1/settlements/finalize",
    request_body = FinalizeSettlementRequest,
    responses(
        (status = 200, description = "Settlement finalized", body = ApiResponse<FinalizeOutcome>),
        (status = 400, description = "Missing tenancy id or inactive tenancy", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown tenancy", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "settlements"
)]
pub async fn finalize_settlement(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<FinalizeSettlementRequest>,
) -> ApiResult<FinalizeOutcome> {
    let outcome = state
        .services
        .settlement
        .finalize(&payload, &user.email)
        .await?;
    let outcome = FinalizeOutcome {
        tenancy: outcome.tenancy.with_contact_visible(user.is_admin()),
        ..outcome
    };
    Ok(Json(ApiResponse::success(outcome)))
}
