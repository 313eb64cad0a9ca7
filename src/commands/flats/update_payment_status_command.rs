use crate::{
    commands::{parse_flexible_date, Command},
    db::DbPool,
    entities::flat,
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::NaiveDate;
use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum::{Display, EnumString};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PaymentStatus {
    Paid,
    Unpaid,
}

/// Flips a flat between paid and unpaid. Paid requires a date.
#[derive(Debug, Clone)]
pub struct UpdatePaymentStatusCommand {
    pub flat_id: String,
    pub status: PaymentStatus,
    /// `YYYY-MM-DD` or `DD-MM-YYYY`
    pub paid_on: Option<String>,
}

impl UpdatePaymentStatusCommand {
    /// Resolves the date to store, rejecting `paid` without one.
    pub fn resolved_paid_on(&self) -> Result<Option<NaiveDate>, ServiceError> {
        match self.status {
            PaymentStatus::Unpaid => Ok(None),
            PaymentStatus::Paid => {
                let raw = self
                    .paid_on
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| {
                        ServiceError::ValidationError(
                            "paid_on is required when marking a flat as paid".to_string(),
                        )
                    })?;
                parse_flexible_date(raw).map(Some)
            }
        }
    }
}

#[async_trait::async_trait]
impl Command for UpdatePaymentStatusCommand {
    type Result = flat::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(flat_id = %self.flat_id, status = %self.status))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let paid_on = self.resolved_paid_on().map_err(|e| {
            warn!("Payment status rejected: {}", e);
            e
        })?;

        let db = db_pool.as_ref();
        let existing = flat::Entity::find_by_id(self.flat_id.clone())
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Flat {} not found", self.flat_id)))?;

        let mut active = existing.into_active_model();
        active.status = Set(self.status.to_string());
        active.paid_on = Set(paid_on);
        let updated = active.update(db).await?;

        info!("Payment status updated");
        event_sender
            .send_or_log(Event::PaymentStatusChanged {
                flat_id: updated.flat_id.clone(),
                status: updated.status.clone(),
                paid_on: updated.paid_on,
            });

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(status: PaymentStatus, paid_on: Option<&str>) -> UpdatePaymentStatusCommand {
        UpdatePaymentStatusCommand {
            flat_id: "sunshine-towers-101".into(),
            status,
            paid_on: paid_on.map(str::to_string),
        }
    }

    #[test]
    fn paid_requires_a_date() {
        assert!(matches!(
            command(PaymentStatus::Paid, None).resolved_paid_on(),
            Err(ServiceError::ValidationError(_))
        ));
        assert!(command(PaymentStatus::Paid, Some("  ")).resolved_paid_on().is_err());
    }

    #[test]
    fn unpaid_clears_the_date() {
        assert_eq!(
            command(PaymentStatus::Unpaid, Some("2024-01-01"))
                .resolved_paid_on()
                .unwrap(),
            None
        );
    }

    #[test]
    fn paid_accepts_day_first_dates() {
        assert_eq!(
            command(PaymentStatus::Paid, Some("15-02-2024"))
                .resolved_paid_on()
                .unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 15)
        );
    }

    #[test]
    fn status_round_trips_through_strings() {
        assert_eq!(PaymentStatus::Paid.to_string(), "paid");
        assert_eq!("unpaid".parse::<PaymentStatus>().unwrap(), PaymentStatus::Unpaid);
    }
}
