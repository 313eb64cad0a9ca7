use crate::{
    commands::{
        deserialize_lenient_amount, deserialize_optional_lenient_amount, validate_non_negative,
        validate_not_blank,
    },
    db::DbPool,
    entities::{flat, maintenance_record, tenancy},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use strum::{Display, EnumString};
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Categories offered by the maintenance form; anything else is accepted as free text.
pub const MAINTENANCE_CATEGORIES: &[&str] = &[
    "Plumbing",
    "Electrical",
    "Carpentry",
    "Cleaning",
    "Painting",
    "Pest Control",
    "General Repair",
    "Appliance Repair",
    "Security",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, ToSchema)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
}

fn parse_severity(raw: Option<&str>) -> Result<Option<Severity>, ServiceError> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            Severity::from_str(s).map_err(|_| {
                ServiceError::ValidationError(format!(
                    "invalid severity '{}': expected low, medium or high",
                    s
                ))
            })
        })
        .transpose()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateMaintenanceRequest {
    #[validate(custom = "validate_not_blank")]
    pub flat_id: String,
    pub tenancy_id: Option<Uuid>,
    #[validate(length(max = 100), custom = "validate_not_blank")]
    pub category: String,
    #[validate(length(max = 5000), custom = "validate_not_blank")]
    pub description: String,
    /// `low`, `medium` or `high`; defaults to `low`.
    pub severity: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_amount")]
    #[validate(custom = "validate_non_negative")]
    #[schema(value_type = String, example = "1200")]
    pub cost: Decimal,
    pub reported_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateMaintenanceRequest {
    #[validate(length(max = 100), custom = "validate_not_blank")]
    pub category: Option<String>,
    #[validate(length(max = 5000), custom = "validate_not_blank")]
    pub description: Option<String>,
    pub severity: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_lenient_amount")]
    #[validate(custom = "validate_non_negative")]
    #[schema(value_type = Option<String>)]
    pub cost: Option<Decimal>,
    pub reported_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MaintenanceQuery {
    pub flat_id: Option<String>,
}

#[derive(Clone)]
pub struct MaintenanceService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl MaintenanceService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Newest first, optionally for one flat.
    #[instrument(skip(self))]
    pub async fn list(&self, flat_id: Option<&str>) -> Result<Vec<maintenance_record::Model>, ServiceError> {
        let mut query = maintenance_record::Entity::find();
        if let Some(flat_id) = flat_id.filter(|f| !f.trim().is_empty()) {
            query = query.filter(maintenance_record::Column::FlatId.eq(flat_id.trim()));
        }
        Ok(query
            .order_by_desc(maintenance_record::Column::ReportedAt)
            .all(self.db_pool.as_ref())
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<maintenance_record::Model, ServiceError> {
        maintenance_record::Entity::find_by_id(id)
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Maintenance record {} not found", id)))
    }

    #[instrument(skip(self, request), fields(flat_id = %request.flat_id))]
    pub async fn create(
        &self,
        request: CreateMaintenanceRequest,
    ) -> Result<maintenance_record::Model, ServiceError> {
        request.validate()?;
        let severity = parse_severity(request.severity.as_deref())?.unwrap_or_default();
        let flat_id = request.flat_id.trim().to_string();
        let db = self.db_pool.as_ref();

        flat::Entity::find_by_id(flat_id.clone())
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Flat {} not found", flat_id)))?;

        if let Some(tenancy_id) = request.tenancy_id {
            let tenancy = tenancy::Entity::find_by_id(tenancy_id)
                .one(db)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("Tenancy {} not found", tenancy_id)))?;
            if tenancy.flat_id != flat_id {
                return Err(ServiceError::ValidationError(format!(
                    "tenancy {} does not belong to flat {}",
                    tenancy_id, flat_id
                )));
            }
        }

        let now = Utc::now();
        let saved = maintenance_record::ActiveModel {
            id: Set(Uuid::new_v4()),
            flat_id: Set(flat_id),
            tenancy_id: Set(request.tenancy_id),
            category: Set(request.category.trim().to_string()),
            description: Set(request.description.trim().to_string()),
            severity: Set(severity.to_string()),
            cost: Set(request.cost),
            reported_at: Set(request.reported_at.unwrap_or(now)),
            created_at: Set(now),
            updated_at: Set(None),
        }
        .insert(db)
        .await?;

        info!(record_id = %saved.id, "Maintenance recorded");
        self.event_sender
            .send_or_log(Event::MaintenanceRecorded {
                record_id: saved.id,
                flat_id: saved.flat_id.clone(),
            });
        Ok(saved)
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateMaintenanceRequest,
    ) -> Result<maintenance_record::Model, ServiceError> {
        request.validate()?;
        let severity = parse_severity(request.severity.as_deref())?;
        let mut active = self.get(id).await?.into_active_model();

        if let Some(category) = request.category {
            active.category = Set(category.trim().to_string());
        }
        if let Some(description) = request.description {
            active.description = Set(description.trim().to_string());
        }
        if let Some(severity) = severity {
            active.severity = Set(severity.to_string());
        }
        if let Some(cost) = request.cost {
            active.cost = Set(cost);
        }
        if let Some(reported_at) = request.reported_at {
            active.reported_at = Set(reported_at);
        }

        Ok(active.update(self.db_pool.as_ref()).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let existing = self.get(id).await?;
        existing.delete(self.db_pool.as_ref()).await?;
        info!(record_id = %id, "Maintenance record deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_defaults_and_parses_loosely() {
        assert_eq!(parse_severity(None).unwrap(), None);
        assert_eq!(parse_severity(Some("")).unwrap(), None);
        assert_eq!(parse_severity(Some("High")).unwrap(), Some(Severity::High));
        assert!(parse_severity(Some("urgent")).is_err());
        assert_eq!(Severity::default().to_string(), "low");
    }

    #[test]
    fn cost_text_keeps_digits() {
        let request: CreateMaintenanceRequest = serde_json::from_str(
            r#"{"flat_id":"a-1","category":"Plumbing","description":"Leak","cost":"Rs 1,200"}"#,
        )
        .unwrap();
        assert_eq!(request.cost, Decimal::new(1200, 0));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn blank_description_is_invalid() {
        let request = CreateMaintenanceRequest {
            flat_id: "a-1".into(),
            category: "Plumbing".into(),
            description: "  ".into(),
            ..Default::default()
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn known_categories_include_pest_control() {
        assert!(MAINTENANCE_CATEGORIES.contains(&"Pest Control"));
    }
}
