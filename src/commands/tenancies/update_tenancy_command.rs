use crate::{
    commands::{deserialize_optional_lenient_amount, Command},
    db::DbPool,
    entities::tenancy,
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::CreateTenancyCommand;

/// Partial update; absent fields keep their stored value and empty strings clear text fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateTenancyRequest {
    pub tenant_name: Option<String>,
    pub tenant_email: Option<String>,
    pub phone_number: Option<String>,
    pub age: Option<i32>,
    pub occupation_type: Option<String>,
    pub company_name: Option<String>,
    pub business_name: Option<String>,
    pub family_status: Option<String>,
    pub family_members: Option<i32>,
    pub children_count: Option<i32>,
    pub children_ages: Option<Vec<i32>>,
    pub partner_aadhar_url: Option<String>,
    pub bachelors_count: Option<i32>,
    pub bachelors_aadhar_urls: Option<Vec<String>>,
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_lenient_amount")]
    #[schema(value_type = Option<String>)]
    pub deposit_amount: Option<Decimal>,
    pub aadhar_url: Option<String>,
    pub pan_url: Option<String>,
    pub offer_letter_url: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub reason_for_exit: Option<String>,
    pub is_active: Option<bool>,
}

impl UpdateTenancyRequest {
    pub(crate) fn apply(&self, target: &mut CreateTenancyCommand) {
        macro_rules! merge {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = &self.$field {
                    target.$field = Some(value.clone());
                })*
            };
        }

        if let Some(name) = &self.tenant_name {
            target.tenant_name = name.clone();
        }
        if let Some(deposit) = self.deposit_amount {
            target.deposit_amount = deposit;
        }
        if let Some(active) = self.is_active {
            target.is_active = active;
        }
        merge!(
            tenant_email,
            phone_number,
            age,
            occupation_type,
            company_name,
            business_name,
            family_status,
            family_members,
            children_count,
            children_ages,
            partner_aadhar_url,
            bachelors_count,
            bachelors_aadhar_urls,
            gender,
            aadhar_url,
            pan_url,
            offer_letter_url,
            start_date,
            end_date,
            reason_for_exit,
        );
    }
}

#[derive(Debug, Clone)]
pub struct UpdateTenancyCommand {
    pub tenancy_id: Uuid,
    pub changes: UpdateTenancyRequest,
}

#[async_trait::async_trait]
impl Command for UpdateTenancyCommand {
    type Result = tenancy::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(tenancy_id = %self.tenancy_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let db = db_pool.as_ref();
        let existing = tenancy::Entity::find_by_id(self.tenancy_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Tenancy {} not found", self.tenancy_id))
            })?;

        let mut fields = CreateTenancyCommand::from_model(&existing);
        self.changes.apply(&mut fields);
        fields.normalize();
        fields.validate()?;
        let (start_date, end_date) = fields.resolve_dates()?;

        if fields.is_active && !existing.is_active {
            super::ensure_no_other_active_tenancy(db, &fields.flat_id, Some(existing.id)).await?;
        }

        let mut active = existing.into_active_model();
        fields.assign_to(&mut active, start_date, end_date)?;
        let updated = active
            .update(db)
            .await
            .map_err(|e| super::active_tenancy_conflict(&fields.flat_id, e))?;

        info!("Tenancy updated");
        event_sender
            .send_or_log(Event::TenancyUpdated(updated.id));
        Ok(updated)
    }
}
