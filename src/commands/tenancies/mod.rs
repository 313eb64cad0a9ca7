pub mod create_tenancy_command;
pub mod end_tenancy_command;
pub mod update_tenancy_command;

pub use create_tenancy_command::CreateTenancyCommand;
pub use end_tenancy_command::EndTenancyCommand;
pub use update_tenancy_command::{UpdateTenancyCommand, UpdateTenancyRequest};

use crate::{entities::tenancy, errors::ServiceError};
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, SqlErr};
use uuid::Uuid;

/// Fails with `Conflict` when `flat_id` already has an active tenancy other than `except`.
pub(crate) async fn ensure_no_other_active_tenancy<C: ConnectionTrait>(
    db: &C,
    flat_id: &str,
    except: Option<Uuid>,
) -> Result<(), ServiceError> {
    let mut query = tenancy::Entity::find()
        .filter(tenancy::Column::FlatId.eq(flat_id))
        .filter(tenancy::Column::IsActive.eq(true));
    if let Some(id) = except {
        query = query.filter(tenancy::Column::Id.ne(id));
    }

    if let Some(current) = query.one(db).await? {
        return Err(ServiceError::Conflict(format!(
            "Flat {} already has an active tenant ({})",
            flat_id, current.tenant_name
        )));
    }
    Ok(())
}

/// Turns a write rejected by the one-active-tenancy-per-flat index into a
/// `Conflict`. Two requests can both pass
/// [`ensure_no_other_active_tenancy`] before either commits; the index
/// catches the second one.
pub(crate) fn active_tenancy_conflict(flat_id: &str, err: DbErr) -> ServiceError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => ServiceError::Conflict(format!(
            "Flat {} already has an active tenant",
            flat_id
        )),
        _ => ServiceError::DatabaseError(err),
    }
}
