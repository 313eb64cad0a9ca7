use crate::{
    commands::{deserialize_lenient_amount, validate_non_negative, validate_not_blank, Command},
    db::DbPool,
    entities::flat,
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use validator::Validate;

static NON_SLUG_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("slug pattern is valid"));

/// `"Sunshine Towers", "101"` becomes `sunshine-towers-101`.
pub fn slugify_flat_id(apartment_name: &str, flat_number: Option<&str>) -> String {
    let raw = match flat_number.map(str::trim).filter(|n| !n.is_empty()) {
        Some(number) => format!("{} {}", apartment_name, number),
        None => apartment_name.to_string(),
    };
    NON_SLUG_CHARS
        .replace_all(&raw.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateFlatCommand {
    /// Optional explicit identifier; slugified like a generated one.
    pub flat_id: Option<String>,
    #[validate(length(max = 200), custom = "validate_not_blank")]
    pub apartment_name: String,
    #[validate(length(max = 50))]
    pub flat_number: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_amount")]
    #[validate(custom = "validate_non_negative")]
    #[schema(value_type = String, example = "15000")]
    pub rent_amount: Decimal,
    pub due_date: Option<NaiveDate>,
    /// Defaults to the signed-in user's email.
    #[validate(email)]
    pub owner_email: Option<String>,
}

#[async_trait::async_trait]
impl Command for CreateFlatCommand {
    type Result = flat::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(apartment = %self.apartment_name))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;

        let owner_email = self
            .owner_email
            .clone()
            .filter(|email| !email.trim().is_empty())
            .ok_or_else(|| ServiceError::ValidationError("owner_email is required".to_string()))?;

        let flat_id = self.resolve_flat_id()?;
        let db = db_pool.as_ref();

        if flat::Entity::find_by_id(flat_id.clone()).one(db).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Flat {} already exists",
                flat_id
            )));
        }

        let model = flat::ActiveModel {
            flat_id: Set(flat_id.clone()),
            apartment_name: Set(self.apartment_name.trim().to_string()),
            flat_number: Set(self
                .flat_number
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string)),
            rent_amount: Set(self.rent_amount),
            due_date: Set(self.due_date),
            owner_email: Set(owner_email),
            status: Set(super::PaymentStatus::Unpaid.to_string()),
            paid_on: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };

        let saved = model.insert(db).await.map_err(|e| {
            error!(flat_id = %flat_id, "Failed to insert flat: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        info!(flat_id = %saved.flat_id, "Flat created");

        let row = serde_json::to_value(&saved)
            .map_err(|e| ServiceError::InternalError(format!("failed to encode flat: {}", e)))?;
        event_sender
            .send_or_log(Event::FlatCreated {
                flat_id: saved.flat_id.clone(),
                row,
            });

        Ok(saved)
    }
}

impl CreateFlatCommand {
    fn resolve_flat_id(&self) -> Result<String, ServiceError> {
        let id = match self.flat_id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(explicit) => slugify_flat_id(explicit, None),
            None => slugify_flat_id(&self.apartment_name, self.flat_number.as_deref()),
        };
        if id.is_empty() {
            return Err(ServiceError::ValidationError(
                "flat identifier must contain letters or digits".to_string(),
            ));
        }
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_join_name_and_number() {
        assert_eq!(slugify_flat_id("Sunshine Towers", Some("101")), "sunshine-towers-101");
        assert_eq!(slugify_flat_id("  Palm  Court ", Some("C-203")), "palm-court-c-203");
        assert_eq!(slugify_flat_id("Lake View", None), "lake-view");
        assert_eq!(slugify_flat_id("Lake View", Some("  ")), "lake-view");
        assert_eq!(slugify_flat_id("***", None), "");
    }

    #[test]
    fn explicit_ids_are_normalised() {
        let cmd = CreateFlatCommand {
            flat_id: Some("Sunshine_Towers 101".into()),
            apartment_name: "Sunshine Towers".into(),
            flat_number: None,
            rent_amount: Decimal::ZERO,
            due_date: None,
            owner_email: None,
        };
        assert_eq!(cmd.resolve_flat_id().unwrap(), "sunshine-towers-101");
    }
}
