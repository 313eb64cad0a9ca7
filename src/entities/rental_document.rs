use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "rental_documents")]
#[schema(as = RentalDocument)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub flat_id: String,
    pub tenant_id: Option<Uuid>,
    /// `agreement`, `payment` or `exit_pdf`
    #[sea_orm(column_name = "type")]
    #[serde(rename = "type")]
    pub doc_type: String,
    /// `YYYY-MM`
    pub month: Option<String>,
    pub file_url: String,
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
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

impl Related<super::flat::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Flat.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
