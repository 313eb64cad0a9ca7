pub mod flat;
pub mod maintenance_record;
pub mod occupied_flat;
pub mod rental_document;
pub mod tenancy;
pub mod user;
