use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "RentDesk API",
        version = "1.0.0",
        description = r#"
# RentDesk Property Management API

Tracks flats, tenants, maintenance tickets, rental documents and rent payments,
and settles tenant exits.

## Authentication

Sign in through `/auth/sign-in` and send the returned token on every `/api/v1` call:

```
Authorization: Bearer <your-jwt-token>
```

## Error Handling

Failures share one body shape:

```json
{
  "error": "Bad Request",
  "message": "Validation error: paid_on is required when marking a flat as paid",
  "request_id": "req-abc123xyz",
  "timestamp": "2025-01-01T00:00:00Z"
}
```

## Amounts

Money fields are decimals serialised as strings. Request amounts accept numbers
or text; text keeps its digits only, so `"Rs. 1,500"` reads as `1500`.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "auth", description = "Accounts and sessions"),
        (name = "flats", description = "Flats and the dashboard"),
        (name = "payments", description = "Rent payment status"),
        (name = "tenancies", description = "Current and past tenants"),
        (name = "maintenance", description = "Maintenance history"),
        (name = "documents", description = "Rental documents"),
        (name = "settlements", description = "Tenant exit settlement"),
        (name = "storage", description = "Raw blob storage")
    ),
    paths(
        // Auth
        crate::auth::sign_up_handler,
        crate::auth::sign_in_handler,
        crate::auth::sign_out_handler,
        crate::auth::session_handler,

        // Flats
        crate::handlers::flats::list_flats,
        crate::handlers::flats::create_flat,
        crate::handlers::flats::get_flat,
        crate::handlers::flats::update_flat,
        crate::handlers::flats::delete_flat,
        crate::handlers::flats::flat_detail,
        crate::handlers::flats::update_payment,
        crate::handlers::flats::upload_payment_proof,

        // Tenancies
        crate::handlers::tenancies::list_tenancies,
        crate::handlers::tenancies::create_tenancy,
        crate::handlers::tenancies::create_past_tenancy,
        crate::handlers::tenancies::get_tenancy,
        crate::handlers::tenancies::update_tenancy,
        crate::handlers::tenancies::end_tenancy,
        crate::handlers::tenancies::delete_tenancy,
        crate::handlers::tenancies::upload_tenancy_document,

        // Maintenance
        crate::handlers::maintenance::list_maintenance,
        crate::handlers::maintenance::list_categories,
        crate::handlers::maintenance::create_maintenance,
        crate::handlers::maintenance::get_maintenance,
        crate::handlers::maintenance::update_maintenance,
        crate::handlers::maintenance::delete_maintenance,

        // Documents
        crate::handlers::documents::list_flat_documents,
        crate::handlers::documents::upload_flat_document,
        crate::handlers::documents::update_document,
        crate::handlers::documents::delete_document,

        // Settlements
        crate::handlers::settlements::quote_settlement,
        crate::handlers::settlements::settlement_pdf,
        crate::handlers::settlements::finalize_settlement,

        // Storage
        crate::handlers::storage::upload_object,
        crate::handlers::storage::delete_object,
    ),
    components(
        schemas(
            crate::auth::SignUpRequest,
            crate::auth::SignInRequest,
            crate::auth::Session,
            crate::auth::SessionInfo,
            crate::auth::SessionUser,

            crate::entities::flat::Model,
            crate::entities::tenancy::Model,
            crate::entities::maintenance_record::Model,
            crate::entities::rental_document::Model,

            crate::services::FlatCard,
            crate::services::OccupancyFilter,
            crate::services::flats::UpdateFlatRequest,
            crate::services::flats::FlatDetail,
            crate::commands::flats::CreateFlatCommand,
            crate::commands::flats::PaymentStatus,
            crate::handlers::flats::UpdatePaymentRequest,
            crate::services::payments::PaymentProofOutcome,

            crate::commands::tenancies::CreateTenancyCommand,
            crate::commands::tenancies::UpdateTenancyRequest,
            crate::handlers::tenancies::EndTenancyRequest,

            crate::services::maintenance::CreateMaintenanceRequest,
            crate::services::maintenance::UpdateMaintenanceRequest,
            crate::services::maintenance::Severity,

            crate::services::documents::DocumentType,
            crate::services::documents::UpdateDocumentRequest,

            crate::services::settlement::Deduction,
            crate::services::settlement::SettlementRequest,
            crate::services::settlement::SettlementQuote,
            crate::services::settlement::FinalizeSettlementRequest,
            crate::services::settlement::FinalizeOutcome,

            crate::handlers::storage::UploadedObject,

            crate::errors::ErrorResponse
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDocV1;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_generation() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("RentDesk API"));
        assert!(json.contains("/api/v1/flats"));
        assert!(json.contains("/api/v1/settlements/quote"));
        assert!(json.contains("bearer_auth"));
    }
}
