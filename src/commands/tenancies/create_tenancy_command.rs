use crate::{
    commands::{deserialize_lenient_amount, validate_non_negative, validate_not_blank, Command},
    db::DbPool,
    entities::{flat, tenancy},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

const OCCUPATION_WORKING: &str = "Working";
const OCCUPATION_BUSINESS: &str = "Business";
const FAMILY: &str = "Family";
const BACHELORS: &str = "Bachelors";

/// Registers a tenant against a flat, either current (`is_active`) or historical.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateTenancyCommand {
    #[validate(custom = "validate_not_blank")]
    pub flat_id: String,
    #[validate(length(max = 200), custom = "validate_not_blank")]
    pub tenant_name: String,
    #[validate(email)]
    pub tenant_email: Option<String>,
    #[validate(length(max = 20))]
    pub phone_number: Option<String>,
    #[validate(range(min = 0, max = 150))]
    pub age: Option<i32>,
    /// `Working`, `Business`, `Student` or free text
    pub occupation_type: Option<String>,
    pub company_name: Option<String>,
    pub business_name: Option<String>,
    /// `Family` or `Bachelors`
    pub family_status: Option<String>,
    #[validate(range(min = 0))]
    pub family_members: Option<i32>,
    #[validate(range(min = 0))]
    pub children_count: Option<i32>,
    pub children_ages: Option<Vec<i32>>,
    pub partner_aadhar_url: Option<String>,
    #[validate(range(min = 0))]
    pub bachelors_count: Option<i32>,
    pub bachelors_aadhar_urls: Option<Vec<String>>,
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_amount")]
    #[validate(custom = "validate_non_negative")]
    #[schema(value_type = String, example = "30000")]
    pub deposit_amount: Decimal,
    pub aadhar_url: Option<String>,
    pub pan_url: Option<String>,
    pub offer_letter_url: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub reason_for_exit: Option<String>,
    /// Set by the route: current tenants are active, past tenants are not.
    #[serde(skip)]
    pub is_active: bool,
}

fn clean(value: &mut Option<String>) {
    *value = value
        .take()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
}

fn is(value: &Option<String>, expected: &str) -> bool {
    value
        .as_deref()
        .map(|v| v.eq_ignore_ascii_case(expected))
        .unwrap_or(false)
}

impl CreateTenancyCommand {
    /// Trims text, keeps phone digits only and drops fields that do not
    /// apply to the chosen occupation and household type.
    pub fn normalize(&mut self) {
        self.flat_id = self.flat_id.trim().to_string();
        self.tenant_name = self.tenant_name.trim().to_string();
        for field in [
            &mut self.tenant_email,
            &mut self.occupation_type,
            &mut self.company_name,
            &mut self.business_name,
            &mut self.family_status,
            &mut self.partner_aadhar_url,
            &mut self.gender,
            &mut self.aadhar_url,
            &mut self.pan_url,
            &mut self.offer_letter_url,
            &mut self.reason_for_exit,
        ] {
            clean(field);
        }

        self.phone_number = self
            .phone_number
            .take()
            .map(|p| p.chars().filter(char::is_ascii_digit).collect::<String>())
            .filter(|p| !p.is_empty());

        if !is(&self.occupation_type, OCCUPATION_WORKING) {
            self.company_name = None;
        }
        if !is(&self.occupation_type, OCCUPATION_BUSINESS) {
            self.business_name = None;
        }

        if !is(&self.family_status, FAMILY) {
            self.family_members = None;
            self.children_count = None;
            self.children_ages = None;
            self.partner_aadhar_url = None;
        }
        if !is(&self.family_status, BACHELORS) {
            self.bachelors_count = None;
            self.bachelors_aadhar_urls = None;
            self.gender = None;
        } else if let Some(urls) = self.bachelors_aadhar_urls.as_mut() {
            urls.retain(|u| !u.trim().is_empty());
        }
    }

    /// Date rules that depend on whether the tenancy is current or past.
    pub fn resolve_dates(&self) -> Result<(NaiveDate, Option<NaiveDate>), ServiceError> {
        let start = match (self.start_date, self.is_active) {
            (Some(start), _) => start,
            (None, true) => Utc::now().date_naive(),
            (None, false) => {
                return Err(ServiceError::ValidationError(
                    "start_date is required for a past tenancy".to_string(),
                ))
            }
        };

        if let Some(end) = self.end_date {
            if end < start {
                return Err(ServiceError::ValidationError(
                    "end_date must not be before start_date".to_string(),
                ));
            }
        }
        Ok((start, self.end_date))
    }

    /// Copies every column except ids and timestamps into `active`.
    pub(crate) fn assign_to(
        &self,
        active: &mut tenancy::ActiveModel,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
    ) -> Result<(), ServiceError> {
        active.flat_id = Set(self.flat_id.clone());
        active.tenant_name = Set(self.tenant_name.clone());
        active.tenant_email = Set(self.tenant_email.clone());
        active.phone_number = Set(self.phone_number.clone());
        active.age = Set(self.age);
        active.occupation_type = Set(self.occupation_type.clone());
        active.company_name = Set(self.company_name.clone());
        active.business_name = Set(self.business_name.clone());
        active.family_status = Set(self.family_status.clone());
        active.family_members = Set(self.family_members);
        active.children_count = Set(self.children_count);
        active.children_ages = Set(list_to_json(&self.children_ages)?);
        active.partner_aadhar_url = Set(self.partner_aadhar_url.clone());
        active.bachelors_count = Set(self.bachelors_count);
        active.bachelors_aadhar_urls = Set(list_to_json(&self.bachelors_aadhar_urls)?);
        active.gender = Set(self.gender.clone());
        active.deposit_amount = Set(self.deposit_amount);
        active.aadhar_url = Set(self.aadhar_url.clone());
        active.pan_url = Set(self.pan_url.clone());
        active.offer_letter_url = Set(self.offer_letter_url.clone());
        active.start_date = Set(start_date);
        active.end_date = Set(end_date);
        active.reason_for_exit = Set(self.reason_for_exit.clone());
        active.is_active = Set(self.is_active);
        Ok(())
    }

    /// Rebuilds the editable fields of a stored tenancy.
    pub(crate) fn from_model(model: &tenancy::Model) -> Self {
        Self {
            flat_id: model.flat_id.clone(),
            tenant_name: model.tenant_name.clone(),
            tenant_email: model.tenant_email.clone(),
            phone_number: model.phone_number.clone(),
            age: model.age,
            occupation_type: model.occupation_type.clone(),
            company_name: model.company_name.clone(),
            business_name: model.business_name.clone(),
            family_status: model.family_status.clone(),
            family_members: model.family_members,
            children_count: model.children_count,
            children_ages: model
                .children_ages
                .clone()
                .and_then(|v| serde_json::from_value(v).ok()),
            partner_aadhar_url: model.partner_aadhar_url.clone(),
            bachelors_count: model.bachelors_count,
            bachelors_aadhar_urls: model
                .bachelors_aadhar_urls
                .clone()
                .and_then(|v| serde_json::from_value(v).ok()),
            gender: model.gender.clone(),
            deposit_amount: model.deposit_amount,
            aadhar_url: model.aadhar_url.clone(),
            pan_url: model.pan_url.clone(),
            offer_letter_url: model.offer_letter_url.clone(),
            start_date: Some(model.start_date),
            end_date: model.end_date,
            reason_for_exit: model.reason_for_exit.clone(),
            is_active: model.is_active,
        }
    }
}

/// Optional list columns are stored as JSON arrays.
fn list_to_json<T: Serialize>(
    list: &Option<Vec<T>>,
) -> Result<Option<serde_json::Value>, ServiceError> {
    list.as_ref()
        .map(serde_json::to_value)
        .transpose()
        .map_err(|e| ServiceError::InternalError(format!("failed to encode list: {}", e)))
}

#[async_trait::async_trait]
impl Command for CreateTenancyCommand {
    type Result = tenancy::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(flat_id = %self.flat_id, active = self.is_active))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let mut input = self.clone();
        input.normalize();
        input.validate()?;
        let (start_date, end_date) = input.resolve_dates()?;

        let db = db_pool.as_ref();
        if flat::Entity::find_by_id(input.flat_id.clone())
            .one(db)
            .await?
            .is_none()
        {
            return Err(ServiceError::NotFound(format!(
                "Flat {} not found",
                input.flat_id
            )));
        }

        if input.is_active {
            super::ensure_no_other_active_tenancy(db, &input.flat_id, None).await?;
        }

        let mut model = tenancy::ActiveModel {
            id: Set(Uuid::new_v4()),
            pdf_url: Set(None),
            pdf_uploaded_at: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
            ..Default::default()
        };
        input.assign_to(&mut model, start_date, end_date)?;

        let saved = model.insert(db).await.map_err(|e| {
            error!("Failed to insert tenancy: {}", e);
            super::active_tenancy_conflict(&input.flat_id, e)
        })?;

        info!(tenancy_id = %saved.id, "Tenancy created");
        event_sender
            .send_or_log(Event::TenancyCreated {
                tenancy_id: saved.id,
                flat_id: saved.flat_id.clone(),
                is_active: saved.is_active,
            });

        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> CreateTenancyCommand {
        CreateTenancyCommand {
            flat_id: " sunshine-towers-101 ".into(),
            tenant_name: " Asha Rao ".into(),
            phone_number: Some("+91 98450-12345".into()),
            occupation_type: Some("Working".into()),
            company_name: Some("Acme".into()),
            business_name: Some("Asha Stores".into()),
            family_status: Some("Family".into()),
            family_members: Some(3),
            children_count: Some(1),
            children_ages: Some(vec![4]),
            bachelors_count: Some(2),
            bachelors_aadhar_urls: Some(vec!["u1".into()]),
            gender: Some("Female".into()),
            is_active: true,
            ..Default::default()
        }
    }

    #[test]
    fn normalize_keeps_only_applicable_fields() {
        let mut cmd = base();
        cmd.normalize();

        assert_eq!(cmd.flat_id, "sunshine-towers-101");
        assert_eq!(cmd.tenant_name, "Asha Rao");
        assert_eq!(cmd.phone_number.as_deref(), Some("919845012345"));
        assert_eq!(cmd.company_name.as_deref(), Some("Acme"));
        assert!(cmd.business_name.is_none());
        assert_eq!(cmd.family_members, Some(3));
        assert!(cmd.bachelors_count.is_none());
        assert!(cmd.bachelors_aadhar_urls.is_none());
        assert!(cmd.gender.is_none());
    }

    #[test]
    fn bachelors_drop_family_fields() {
        let mut cmd = base();
        cmd.occupation_type = Some("business".into());
        cmd.family_status = Some("Bachelors".into());
        cmd.bachelors_aadhar_urls = Some(vec!["u1".into(), "  ".into()]);
        cmd.normalize();

        assert!(cmd.company_name.is_none());
        assert_eq!(cmd.business_name.as_deref(), Some("Asha Stores"));
        assert!(cmd.family_members.is_none());
        assert!(cmd.children_ages.is_none());
        assert_eq!(cmd.bachelors_count, Some(2));
        assert_eq!(cmd.bachelors_aadhar_urls, Some(vec!["u1".to_string()]));
        assert_eq!(cmd.gender.as_deref(), Some("Female"));
    }

    #[test]
    fn active_tenancies_default_start_to_today() {
        let cmd = base();
        let (start, end) = cmd.resolve_dates().unwrap();
        assert_eq!(start, Utc::now().date_naive());
        assert!(end.is_none());
    }

    #[test]
    fn past_tenancies_need_a_start_date_before_the_end() {
        let mut cmd = base();
        cmd.is_active = false;
        assert!(cmd.resolve_dates().is_err());

        cmd.start_date = NaiveDate::from_ymd_opt(2024, 5, 1);
        cmd.end_date = NaiveDate::from_ymd_opt(2024, 4, 1);
        assert!(cmd.resolve_dates().is_err());

        cmd.end_date = NaiveDate::from_ymd_opt(2025, 4, 30);
        assert!(cmd.resolve_dates().is_ok());
    }

    #[test]
    fn blank_names_fail_validation() {
        let mut cmd = base();
        cmd.tenant_name = "   ".into();
        cmd.normalize();
        assert!(cmd.validate().is_err());
    }
}
