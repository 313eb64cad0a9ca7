use crate::{
    commands::{
        deserialize_optional_lenient_amount, flats::CreateFlatCommand, validate_non_negative,
        validate_not_blank, Command,
    },
    db::DbPool,
    entities::{flat, maintenance_record, occupied_flat, rental_document, tenancy},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::dashboard::{build_cards, dashboard_view, FlatCard, OccupancyFilter};

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DashboardQuery {
    /// `all`, `filled` or `vacant`
    #[serde(default)]
    pub filter: OccupancyFilter,
    /// Case-insensitive match on apartment, flat id or tenant name
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateFlatRequest {
    #[validate(length(max = 200), custom = "validate_not_blank")]
    pub apartment_name: Option<String>,
    #[validate(length(max = 50))]
    pub flat_number: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_lenient_amount")]
    #[validate(custom = "validate_non_negative")]
    #[schema(value_type = Option<String>)]
    pub rent_amount: Option<Decimal>,
    pub due_date: Option<NaiveDate>,
    #[validate(email)]
    pub owner_email: Option<String>,
}

/// Everything the flat page shows.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FlatDetail {
    pub flat: flat::Model,
    pub active_tenancy: Option<tenancy::Model>,
    pub past_tenancies: Vec<tenancy::Model>,
    pub maintenance: Vec<maintenance_record::Model>,
    pub documents: Vec<rental_document::Model>,
}

impl FlatDetail {
    /// Applies [`tenancy::Model::with_contact_visible`] to every tenancy in the detail.
    pub fn with_contact_visible(mut self, visible: bool) -> Self {
        self.active_tenancy = self
            .active_tenancy
            .map(|t| t.with_contact_visible(visible));
        self.past_tenancies = self
            .past_tenancies
            .into_iter()
            .map(|t| t.with_contact_visible(visible))
            .collect();
        self
    }
}

#[derive(Clone)]
pub struct FlatService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl FlatService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates a flat, owned by `default_owner` unless the command names someone.
    #[instrument(skip(self, command))]
    pub async fn create_flat(
        &self,
        mut command: CreateFlatCommand,
        default_owner: &str,
    ) -> Result<flat::Model, ServiceError> {
        if command
            .owner_email
            .as_deref()
            .map(|e| e.trim().is_empty())
            .unwrap_or(true)
        {
            command.owner_email = Some(default_owner.to_string());
        }
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self))]
    pub async fn get_flat(&self, flat_id: &str) -> Result<flat::Model, ServiceError> {
        flat::Entity::find_by_id(flat_id.to_string())
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Flat {} not found", flat_id)))
    }

    /// All flats as dashboard cards, in a stable order.
    #[instrument(skip(self))]
    pub async fn load_cards(&self) -> Result<Vec<FlatCard>, ServiceError> {
        let db = self.db_pool.as_ref();
        let flats = flat::Entity::find()
            .order_by_asc(flat::Column::ApartmentName)
            .order_by_asc(flat::Column::FlatId)
            .all(db)
            .await?;
        let occupied = occupied_flat::Entity::find().all(db).await?;
        Ok(build_cards(flats, &occupied))
    }

    #[instrument(skip(self))]
    pub async fn dashboard(&self, query: &DashboardQuery) -> Result<Vec<FlatCard>, ServiceError> {
        let cards = self.load_cards().await?;
        Ok(dashboard_view(
            &cards,
            query.filter,
            query.search.as_deref().unwrap_or_default(),
        ))
    }

    #[instrument(skip(self, request))]
    pub async fn update_flat(
        &self,
        flat_id: &str,
        request: UpdateFlatRequest,
    ) -> Result<flat::Model, ServiceError> {
        request.validate()?;
        let mut active = self.get_flat(flat_id).await?.into_active_model();

        if let Some(name) = request.apartment_name {
            active.apartment_name = Set(name.trim().to_string());
        }
        if let Some(number) = request.flat_number {
            let number = number.trim().to_string();
            active.flat_number = Set((!number.is_empty()).then_some(number));
        }
        if let Some(rent) = request.rent_amount {
            active.rent_amount = Set(rent);
        }
        if let Some(due) = request.due_date {
            active.due_date = Set(Some(due));
        }
        if let Some(owner) = request.owner_email {
            active.owner_email = Set(owner.trim().to_string());
        }

        let updated = active.update(self.db_pool.as_ref()).await?;
        self.event_sender
            .send_or_log(Event::FlatUpdated(updated.flat_id.clone()));
        Ok(updated)
    }

    /// Deletes the flat with its tenancies, maintenance history and documents.
    #[instrument(skip(self))]
    pub async fn delete_flat(&self, flat_id: &str) -> Result<(), ServiceError> {
        self.get_flat(flat_id).await?;

        let id = flat_id.to_string();
        self.db_pool
            .transaction::<_, (), ServiceError>(move |txn| {
                Box::pin(async move {
                    rental_document::Entity::delete_many()
                        .filter(rental_document::Column::FlatId.eq(id.as_str()))
                        .exec(txn)
                        .await?;
                    maintenance_record::Entity::delete_many()
                        .filter(maintenance_record::Column::FlatId.eq(id.as_str()))
                        .exec(txn)
                        .await?;
                    tenancy::Entity::delete_many()
                        .filter(tenancy::Column::FlatId.eq(id.as_str()))
                        .exec(txn)
                        .await?;
                    flat::Entity::delete_by_id(id.clone()).exec(txn).await?;
                    Ok(())
                })
            })
            .await
            .map_err(|e| match e {
                sea_orm::TransactionError::Connection(db) => ServiceError::DatabaseError(db),
                sea_orm::TransactionError::Transaction(service) => service,
            })?;

        info!(flat_id, "Flat deleted");
        self.event_sender
            .send_or_log(Event::FlatDeleted(flat_id.to_string()));
        Ok(())
    }

    /// Flat, active tenant, past tenants, maintenance and documents (newest first).
    #[instrument(skip(self))]
    pub async fn flat_detail(&self, flat_id: &str) -> Result<FlatDetail, ServiceError> {
        let flat = self.get_flat(flat_id).await?;
        let db = self.db_pool.as_ref();

        let tenancies = tenancy::Entity::find()
            .filter(tenancy::Column::FlatId.eq(flat_id))
            .order_by_desc(tenancy::Column::StartDate)
            .all(db)
            .await?;
        let (active, past): (Vec<_>, Vec<_>) = tenancies.into_iter().partition(|t| t.is_active);

        let maintenance = maintenance_record::Entity::find()
            .filter(maintenance_record::Column::FlatId.eq(flat_id))
            .order_by_desc(maintenance_record::Column::ReportedAt)
            .all(db)
            .await?;
        let documents = rental_document::Entity::find()
            .filter(rental_document::Column::FlatId.eq(flat_id))
            .order_by_desc(rental_document::Column::UploadedAt)
            .all(db)
            .await?;

        Ok(FlatDetail {
            flat,
            active_tenancy: active.into_iter().next(),
            past_tenancies: past,
            maintenance,
            documents,
        })
    }
}
