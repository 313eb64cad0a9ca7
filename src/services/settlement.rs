//! Tenant exit settlement: refund arithmetic, the exit summary PDF and
//! the finalize step that files the PDF and ends the tenancy.

use crate::{
    commands::{deserialize_lenient_amount, tenancies::EndTenancyCommand, Command},
    db::DbPool,
    entities::{rental_document, tenancy},
    errors::ServiceError,
    events::{Event, EventSender},
    reports::{exit_summary_file_name, render_exit_summary},
    storage::BucketHandle,
};
use bytes::Bytes;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

pub const EXIT_PDF_FOLDER: &str = "exit-pdfs";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Deduction {
    #[serde(default)]
    pub reason: String,
    /// Number or text; text keeps its digits only.
    #[serde(default, deserialize_with = "deserialize_lenient_amount")]
    #[schema(value_type = String, example = "500")]
    pub amount: Decimal,
}

/// Sum of the deduction amounts. A negative amount would raise the refund
/// above the deposit, so it is rejected.
pub fn total_deductions(deductions: &[Deduction]) -> Result<Decimal, ServiceError> {
    deductions.iter().try_fold(Decimal::ZERO, |acc, d| {
        if d.amount.is_sign_negative() && !d.amount.is_zero() {
            return Err(ServiceError::ValidationError(format!(
                "deduction '{}' has a negative amount",
                d.reason
            )));
        }
        acc.checked_add(d.amount)
            .ok_or_else(|| ServiceError::ValidationError("deductions are too large".to_string()))
    })
}

/// `deposit - sum(deductions)`. Never clamped: a negative refund means the tenant owes money.
pub fn compute_refund(deposit: Decimal, deductions: &[Deduction]) -> Result<Decimal, ServiceError> {
    let total = total_deductions(deductions)?;
    deposit
        .checked_sub(total)
        .ok_or_else(|| ServiceError::ValidationError("deductions are too large".to_string()))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct SettlementRequest {
    pub tenancy_id: Option<Uuid>,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub deductions: Vec<Deduction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SettlementQuote {
    pub tenancy_id: Uuid,
    pub tenant_name: String,
    pub flat_id: String,
    #[schema(value_type = String)]
    pub deposit: Decimal,
    pub deductions: Vec<Deduction>,
    #[schema(value_type = String)]
    pub total_deductions: Decimal,
    #[schema(value_type = String)]
    pub refund: Decimal,
}

impl SettlementQuote {
    pub fn for_tenancy(tenancy: &tenancy::Model, deductions: Vec<Deduction>) -> Result<Self, ServiceError> {
        let total = total_deductions(&deductions)?;
        let refund = compute_refund(tenancy.deposit_amount, &deductions)?;
        Ok(Self {
            tenancy_id: tenancy.id,
            tenant_name: tenancy.tenant_name.clone(),
            flat_id: tenancy.flat_id.clone(),
            deposit: tenancy.deposit_amount,
            deductions,
            total_deductions: total,
            refund,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct FinalizeSettlementRequest {
    #[serde(flatten)]
    pub settlement: SettlementRequest,
    /// Upload the PDF and record it as an `exit_pdf` document.
    #[serde(default)]
    pub store_pdf: bool,
    /// Mark the tenancy as ended.
    #[serde(default)]
    pub end_tenancy: bool,
    pub end_date: Option<NaiveDate>,
    pub reason_for_exit: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FinalizeOutcome {
    pub quote: SettlementQuote,
    pub file_name: String,
    pub document: Option<rental_document::Model>,
    pub tenancy: tenancy::Model,
}

pub struct RenderedSummary {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub quote: SettlementQuote,
}

#[derive(Clone)]
pub struct SettlementService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    bucket: BucketHandle,
}

impl SettlementService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, bucket: BucketHandle) -> Self {
        Self {
            db_pool,
            event_sender,
            bucket,
        }
    }

    async fn active_tenancy(&self, request: &SettlementRequest) -> Result<tenancy::Model, ServiceError> {
        request.validate()?;
        let tenancy_id = request
            .tenancy_id
            .ok_or_else(|| ServiceError::ValidationError("tenancy_id is required".to_string()))?;

        let tenancy = tenancy::Entity::find_by_id(tenancy_id)
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Tenancy {} not found", tenancy_id)))?;

        if !tenancy.is_active {
            return Err(ServiceError::InvalidOperation(format!(
                "Tenancy {} is not active",
                tenancy_id
            )));
        }
        Ok(tenancy)
    }

    #[instrument(skip(self, request))]
    pub async fn quote(&self, request: &SettlementRequest) -> Result<SettlementQuote, ServiceError> {
        let tenancy = self.active_tenancy(request).await?;
        SettlementQuote::for_tenancy(&tenancy, request.deductions.clone())
    }

    #[instrument(skip(self, request))]
    pub async fn render(&self, request: &SettlementRequest) -> Result<RenderedSummary, ServiceError> {
        let quote = self.quote(request).await?;
        let bytes = render_exit_summary(&quote, Utc::now().date_naive())?;
        Ok(RenderedSummary {
            file_name: exit_summary_file_name(&quote.tenant_name),
            bytes,
            quote,
        })
    }

    /// Renders the summary, then optionally files it and ends the tenancy.
    /// A failed document insert leaves the uploaded PDF in place.
    #[instrument(skip(self, request), fields(store_pdf = request.store_pdf, end_tenancy = request.end_tenancy))]
    pub async fn finalize(
        &self,
        request: &FinalizeSettlementRequest,
        uploaded_by: &str,
    ) -> Result<FinalizeOutcome, ServiceError> {
        let rendered = self.render(&request.settlement).await?;
        let quote = rendered.quote;
        let db = self.db_pool.as_ref();

        let document = if request.store_pdf {
            let stored = self
                .bucket
                .put_timestamped(
                    EXIT_PDF_FOLDER,
                    &quote.flat_id,
                    &rendered.file_name,
                    Bytes::from(rendered.bytes),
                )
                .await?;

            let row = rental_document::ActiveModel {
                id: Set(Uuid::new_v4()),
                flat_id: Set(quote.flat_id.clone()),
                tenant_id: Set(Some(quote.tenancy_id)),
                doc_type: Set(super::documents::DocumentType::ExitPdf.to_string()),
                month: Set(Some(Utc::now().format("%Y-%m").to_string())),
                file_url: Set(stored.public_url.clone()),
                uploaded_by: Set(uploaded_by.to_string()),
                uploaded_at: Set(Utc::now()),
            };
            let saved = row.insert(db).await.map_err(|e| {
                error!(path = %stored.path, "exit summary uploaded but not recorded: {}", e);
                ServiceError::DatabaseError(e)
            })?;
            Some(saved)
        } else {
            None
        };

        let tenancy = if request.end_tenancy {
            EndTenancyCommand {
                tenancy_id: quote.tenancy_id,
                end_date: request.end_date,
                reason_for_exit: request.reason_for_exit.clone(),
            }
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await?
        } else {
            tenancy::Entity::find_by_id(quote.tenancy_id)
                .one(db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Tenancy {} not found", quote.tenancy_id))
                })?
        };

        info!(tenancy_id = %quote.tenancy_id, refund = %quote.refund, "Settlement finalized");
        self.event_sender
            .send_or_log(Event::SettlementFinalized {
                tenancy_id: quote.tenancy_id,
                refund: quote.refund,
                at: Utc::now(),
            });

        Ok(FinalizeOutcome {
            quote,
            file_name: rendered.file_name,
            document,
            tenancy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn deduction(reason: &str, amount: Decimal) -> Deduction {
        Deduction {
            reason: reason.to_string(),
            amount,
        }
    }

    #[test]
    fn refund_subtracts_every_deduction() {
        let deductions = vec![deduction("Cleaning", dec!(500)), deduction("Repaint", dec!(1500))];
        assert_eq!(total_deductions(&deductions).unwrap(), dec!(2000));
        assert_eq!(compute_refund(dec!(10000), &deductions).unwrap(), dec!(8000));
    }

    #[test]
    fn refund_is_not_clamped() {
        let deductions = vec![deduction("Damage", dec!(12000))];
        assert_eq!(compute_refund(dec!(10000), &deductions).unwrap(), dec!(-2000));
    }

    #[test]
    fn no_deductions_refunds_the_deposit() {
        assert_eq!(compute_refund(dec!(7500), &[]).unwrap(), dec!(7500));
    }

    #[test]
    fn overflowing_deductions_are_rejected() {
        let deductions = vec![deduction("a", Decimal::MAX), deduction("b", Decimal::MAX)];
        assert!(matches!(
            compute_refund(dec!(1), &deductions),
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[test]
    fn negative_deductions_are_rejected() {
        let deductions = vec![deduction("Cleaning", dec!(500)), deduction("Credit", dec!(-5000))];
        assert!(matches!(
            total_deductions(&deductions),
            Err(ServiceError::ValidationError(msg)) if msg.contains("Credit")
        ));
        assert!(compute_refund(dec!(10000), &deductions).is_err());
    }

    #[test]
    fn deductions_accept_text_amounts() {
        let request: SettlementRequest = serde_json::from_str(
            r#"{"tenancy_id": null, "deductions": [{"reason": "Cleaning", "amount": "Rs. 500"}, {"reason": "Paint", "amount": ""}]}"#,
        )
        .unwrap();
        assert_eq!(request.deductions[0].amount, dec!(500));
        assert_eq!(request.deductions[1].amount, Decimal::ZERO);
    }

    #[test]
    fn finalize_request_flattens_the_settlement() {
        let id = Uuid::new_v4();
        let request: FinalizeSettlementRequest = serde_json::from_value(serde_json::json!({
            "tenancy_id": id,
            "deductions": [{"reason": "Cleaning", "amount": 500}],
            "store_pdf": true
        }))
        .unwrap();
        assert_eq!(request.settlement.tenancy_id, Some(id));
        assert!(request.store_pdf);
        assert!(!request.end_tenancy);
    }
}
