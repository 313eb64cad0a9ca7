use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Read-only view: flats joined with their active tenancy.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "occupied_flats")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub tenancy_id: Uuid,
    pub flat_id: String,
    pub apartment_name: String,
    pub flat_number: Option<String>,
    pub tenant_name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
