use crate::{
    commands::{
        flats::{PaymentStatus, UpdatePaymentStatusCommand},
        Command,
    },
    db::DbPool,
    entities::{flat, rental_document},
    errors::ServiceError,
    events::EventSender,
    storage::BucketHandle,
};
use bytes::Bytes;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use super::documents::DocumentType;

pub const PAYMENT_PROOF_FOLDER: &str = "payments";

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentProofOutcome {
    pub flat: flat::Model,
    pub document: rental_document::Model,
}

#[derive(Clone)]
pub struct PaymentService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    bucket: BucketHandle,
}

impl PaymentService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, bucket: BucketHandle) -> Self {
        Self {
            db_pool,
            event_sender,
            bucket,
        }
    }

    #[instrument(skip(self))]
    pub async fn set_status(
        &self,
        flat_id: &str,
        status: PaymentStatus,
        paid_on: Option<String>,
    ) -> Result<flat::Model, ServiceError> {
        UpdatePaymentStatusCommand {
            flat_id: flat_id.to_string(),
            status,
            paid_on,
        }
        .execute(self.db_pool.clone(), self.event_sender.clone())
        .await
    }

    /// Uploads a payment screenshot, records it for the paid month and marks the flat paid.
    #[instrument(skip(self, content), fields(bytes = content.len()))]
    pub async fn record_payment_proof(
        &self,
        flat_id: &str,
        paid_on: &str,
        file_name: &str,
        content: Bytes,
        uploaded_by: &str,
    ) -> Result<PaymentProofOutcome, ServiceError> {
        let command = UpdatePaymentStatusCommand {
            flat_id: flat_id.to_string(),
            status: PaymentStatus::Paid,
            paid_on: Some(paid_on.to_string()),
        };
        // Rejects a missing or malformed date before anything is written.
        let paid_date = command
            .resolved_paid_on()?
            .ok_or_else(|| ServiceError::ValidationError("paid_on is required".to_string()))?;
        if content.is_empty() {
            return Err(ServiceError::ValidationError("file is empty".to_string()));
        }

        let db = self.db_pool.as_ref();
        flat::Entity::find_by_id(flat_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Flat {} not found", flat_id)))?;

        let stored = self
            .bucket
            .put_timestamped(PAYMENT_PROOF_FOLDER, flat_id, file_name, content)
            .await?;

        let row = rental_document::ActiveModel {
            id: Set(Uuid::new_v4()),
            flat_id: Set(flat_id.to_string()),
            tenant_id: Set(None),
            doc_type: Set(DocumentType::Payment.to_string()),
            month: Set(Some(paid_date.format("%Y-%m").to_string())),
            file_url: Set(stored.public_url.clone()),
            uploaded_by: Set(uploaded_by.to_string()),
            uploaded_at: Set(Utc::now()),
        };
        let document = match row.insert(db).await {
            Ok(document) => document,
            Err(e) => {
                self.bucket.discard(&stored.path).await;
                return Err(e.into());
            }
        };

        let flat = command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await?;

        info!(flat_id, month = ?document.month, "Payment proof recorded");
        Ok(PaymentProofOutcome { flat, document })
    }
}
