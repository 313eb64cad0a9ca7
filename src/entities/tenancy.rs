use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{entity::prelude::*, ActiveValue::Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// One tenant's occupancy of a flat. `is_active` separates current from past tenants.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "tenancies")]
#[schema(as = Tenancy)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub flat_id: String,
    pub tenant_name: String,
    pub tenant_email: Option<String>,
    pub phone_number: Option<String>,
    pub age: Option<i32>,
    pub occupation_type: Option<String>,
    pub company_name: Option<String>,
    pub business_name: Option<String>,
    pub family_status: Option<String>,
    pub family_members: Option<i32>,
    pub children_count: Option<i32>,
    #[schema(value_type = Option<Vec<i32>>)]
    pub children_ages: Option<Json>,
    pub partner_aadhar_url: Option<String>,
    pub bachelors_count: Option<i32>,
    #[schema(value_type = Option<Vec<String>>)]
    pub bachelors_aadhar_urls: Option<Json>,
    pub gender: Option<String>,
    #[schema(value_type = String, example = "30000")]
    pub deposit_amount: Decimal,
    pub aadhar_url: Option<String>,
    pub pan_url: Option<String>,
    pub offer_letter_url: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub reason_for_exit: Option<String>,
    pub is_active: bool,
    pub pdf_url: Option<String>,
    pub pdf_uploaded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::flat::Entity",
        from = "Column::FlatId",
        to = "super::flat::Column::FlatId",
        on_delete = "Cascade"
    )]
    Flat,
}

impl Model {
    /// Blanks the tenant's email and phone unless the caller may see them.
    pub fn with_contact_visible(mut self, visible: bool) -> Self {
        if !visible {
            self.tenant_email = None;
            self.phone_number = None;
        }
        self
    }
}

impl Related<super::flat::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Flat.def()
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
