use crate::{
    commands::Command,
    db::DbPool,
    entities::tenancy,
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, IntoActiveModel, Set};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Moves an active tenancy into the past.
#[derive(Debug, Clone)]
pub struct EndTenancyCommand {
    pub tenancy_id: Uuid,
    /// Defaults to today.
    pub end_date: Option<NaiveDate>,
    pub reason_for_exit: Option<String>,
}

impl EndTenancyCommand {
    pub(crate) async fn end_on<C: ConnectionTrait>(
        &self,
        db: &C,
    ) -> Result<tenancy::Model, ServiceError> {
        let existing = tenancy::Entity::find_by_id(self.tenancy_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Tenancy {} not found", self.tenancy_id))
            })?;

        if !existing.is_active {
            return Err(ServiceError::InvalidOperation(format!(
                "Tenancy {} has already ended",
                self.tenancy_id
            )));
        }

        let end_date = self.end_date.unwrap_or_else(|| Utc::now().date_naive());
        if end_date < existing.start_date {
            return Err(ServiceError::ValidationError(
                "end_date must not be before start_date".to_string(),
            ));
        }

        let reason = self
            .reason_for_exit
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);

        let mut active = existing.into_active_model();
        active.is_active = Set(false);
        active.end_date = Set(Some(end_date));
        if reason.is_some() {
            active.reason_for_exit = Set(reason);
        }
        Ok(active.update(db).await?)
    }
}

#[async_trait::async_trait]
impl Command for EndTenancyCommand {
    type Result = tenancy::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(tenancy_id = %self.tenancy_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let ended = self.end_on(db_pool.as_ref()).await?;

        info!(flat_id = %ended.flat_id, "Tenancy ended");
        event_sender
            .send_or_log(Event::TenancyEnded {
                tenancy_id: ended.id,
                flat_id: ended.flat_id.clone(),
            });
        Ok(ended)
    }
}
