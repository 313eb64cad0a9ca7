use crate::{
    db::DbPool,
    entities::{flat, rental_document},
    errors::ServiceError,
    events::{Event, EventSender},
    storage::BucketHandle,
};
use bytes::Bytes;
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use strum::{Display, EnumString};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum DocumentType {
    Agreement,
    Payment,
    ExitPdf,
}

impl DocumentType {
    /// Folder inside the documents bucket.
    pub fn folder(self) -> &'static str {
        match self {
            DocumentType::Agreement => "rental-agreements",
            DocumentType::Payment => "rent-screenshots",
            DocumentType::ExitPdf => "exit-pdfs",
        }
    }
}

/// Checks a `YYYY-MM` month label.
pub fn parse_month(raw: &str) -> Result<String, ServiceError> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(&format!("{}-01", trimmed), "%Y-%m-%d")
        .map(|d| d.format("%Y-%m").to_string())
        .ok()
        .filter(|normalised| normalised == trimmed)
        .ok_or_else(|| {
            ServiceError::ValidationError(format!("invalid month '{}': expected YYYY-MM", trimmed))
        })
}

/// A file received for a flat, already read from the multipart body.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub doc_type: String,
    pub month: Option<String>,
    pub tenant_id: Option<Uuid>,
    pub file_name: String,
    pub content: Bytes,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateDocumentRequest {
    #[serde(rename = "type")]
    pub doc_type: Option<String>,
    /// `YYYY-MM`; an empty string clears it.
    pub month: Option<String>,
}

#[derive(Clone)]
pub struct DocumentService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    bucket: BucketHandle,
}

impl DocumentService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, bucket: BucketHandle) -> Self {
        Self {
            db_pool,
            event_sender,
            bucket,
        }
    }

    async fn ensure_flat(&self, flat_id: &str) -> Result<(), ServiceError> {
        flat::Entity::find_by_id(flat_id.to_string())
            .one(self.db_pool.as_ref())
            .await?
            .map(|_| ())
            .ok_or_else(|| ServiceError::NotFound(format!("Flat {} not found", flat_id)))
    }

    /// Newest first.
    #[instrument(skip(self))]
    pub async fn list_for_flat(&self, flat_id: &str) -> Result<Vec<rental_document::Model>, ServiceError> {
        self.ensure_flat(flat_id).await?;
        Ok(rental_document::Entity::find()
            .filter(rental_document::Column::FlatId.eq(flat_id))
            .order_by_desc(rental_document::Column::UploadedAt)
            .all(self.db_pool.as_ref())
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<rental_document::Model, ServiceError> {
        rental_document::Entity::find_by_id(id)
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Document {} not found", id)))
    }

    /// Uploads the file, then records it. The upload is discarded when the row cannot be written.
    #[instrument(skip(self, upload), fields(doc_type = %upload.doc_type, bytes = upload.content.len()))]
    pub async fn upload_for_flat(
        &self,
        flat_id: &str,
        upload: DocumentUpload,
        uploaded_by: &str,
    ) -> Result<rental_document::Model, ServiceError> {
        let doc_type = DocumentType::from_str(upload.doc_type.trim()).map_err(|_| {
            ServiceError::ValidationError(format!(
                "unknown document type '{}': expected agreement, payment or exit_pdf",
                upload.doc_type
            ))
        })?;
        let month = upload
            .month
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .map(parse_month)
            .transpose()?;
        if upload.content.is_empty() {
            return Err(ServiceError::ValidationError("file is empty".to_string()));
        }
        self.ensure_flat(flat_id).await?;

        let stored = self
            .bucket
            .put_timestamped(doc_type.folder(), flat_id, &upload.file_name, upload.content)
            .await?;

        let row = rental_document::ActiveModel {
            id: Set(Uuid::new_v4()),
            flat_id: Set(flat_id.to_string()),
            tenant_id: Set(upload.tenant_id),
            doc_type: Set(doc_type.to_string()),
            month: Set(month),
            file_url: Set(stored.public_url.clone()),
            uploaded_by: Set(uploaded_by.to_string()),
            uploaded_at: Set(Utc::now()),
        };
        let saved = match row.insert(self.db_pool.as_ref()).await {
            Ok(saved) => saved,
            Err(e) => {
                self.bucket.discard(&stored.path).await;
                return Err(e.into());
            }
        };

        info!(document_id = %saved.id, "Document uploaded");
        self.event_sender
            .send_or_log(Event::DocumentUploaded {
                document_id: saved.id,
                flat_id: saved.flat_id.clone(),
                doc_type: saved.doc_type.clone(),
            });
        Ok(saved)
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateDocumentRequest,
    ) -> Result<rental_document::Model, ServiceError> {
        let existing = self.get(id).await?;
        let mut active = existing.into_active_model();

        if let Some(raw) = request.doc_type.as_deref() {
            let doc_type = DocumentType::from_str(raw.trim()).map_err(|_| {
                ServiceError::ValidationError(format!("unknown document type '{}'", raw))
            })?;
            active.doc_type = Set(doc_type.to_string());
        }
        if let Some(raw) = request.month.as_deref() {
            let month = if raw.trim().is_empty() {
                None
            } else {
                Some(parse_month(raw)?)
            };
            active.month = Set(month);
        }

        Ok(active.update(self.db_pool.as_ref()).await?)
    }

    /// Removes the blob first so a failure leaves the row pointing at it.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let existing = self.get(id).await?;
        self.bucket.remove_by_url(&existing.file_url).await?;
        existing.delete(self.db_pool.as_ref()).await?;

        info!(document_id = %id, "Document deleted");
        self.event_sender.send_or_log(Event::DocumentDeleted(id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_types_parse_and_print() {
        assert_eq!(DocumentType::ExitPdf.to_string(), "exit_pdf");
        assert_eq!("Agreement".parse::<DocumentType>().unwrap(), DocumentType::Agreement);
        assert!("invoice".parse::<DocumentType>().is_err());
        assert_eq!(DocumentType::Payment.folder(), "rent-screenshots");
    }

    #[test]
    fn months_must_be_year_then_month() {
        assert_eq!(parse_month("2024-03").unwrap(), "2024-03");
        assert!(parse_month("03-2024").is_err());
        assert!(parse_month("2024-13").is_err());
        assert!(parse_month("2024-3").is_err());
    }
}
