use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{entity::prelude::*, ActiveValue::Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A rentable unit, keyed by a human-readable slug.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "flats")]
#[schema(as = Flat)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub flat_id: String,
    pub apartment_name: String,
    pub flat_number: Option<String>,
    #[schema(value_type = String, example = "15000")]
    pub rent_amount: Decimal,
    pub due_date: Option<NaiveDate>,
    pub owner_email: String,
    /// `paid` or `unpaid`
    pub status: String,
    pub paid_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::tenancy::Entity")]
    Tenancies,
    #[sea_orm(has_many = "super::maintenance_record::Entity")]
    Maintenance,
    #[sea_orm(has_many = "super::rental_document::Entity")]
    Documents,
}

impl Related<super::tenancy::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenancies.def()
    }
}

impl Related<super::maintenance_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Maintenance.def()
    }
}

impl Related<super::rental_document::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Documents.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();

        if insert {
            active_model.created_at = Set(now);
        }
        active_model.updated_at = Set(Some(now));

        Ok(active_model)
    }
}
