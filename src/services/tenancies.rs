use crate::{
    commands::{
        tenancies::{CreateTenancyCommand, EndTenancyCommand, UpdateTenancyCommand, UpdateTenancyRequest},
        Command,
    },
    db::DbPool,
    entities::tenancy,
    errors::ServiceError,
    events::{Event, EventSender},
    storage::{sanitize_file_name, BucketHandle},
};
use bytes::Bytes;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;
use strum::{Display, EnumString};
use tracing::{info, instrument};
use utoipa::IntoParams;
use uuid::Uuid;

pub const PREVIOUS_TENANTS_FOLDER: &str = "previous_tenants";

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TenancyQuery {
    /// `true` for current tenants, `false` for past ones
    pub active: Option<bool>,
    pub flat_id: Option<String>,
}

/// Which file a tenancy upload fills in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum TenancyDocumentKind {
    /// Scanned paperwork of a past tenant (PDF only).
    PastTenantPdf,
    Aadhar,
    Pan,
    OfferLetter,
    PartnerAadhar,
    BachelorAadhar,
}

impl TenancyDocumentKind {
    fn folder(self) -> &'static str {
        match self {
            TenancyDocumentKind::PastTenantPdf => PREVIOUS_TENANTS_FOLDER,
            TenancyDocumentKind::Aadhar
            | TenancyDocumentKind::PartnerAadhar
            | TenancyDocumentKind::BachelorAadhar => "aadhar",
            TenancyDocumentKind::Pan => "pan",
            TenancyDocumentKind::OfferLetter => "work-docs",
        }
    }

    pub fn parse(raw: Option<&str>) -> Result<Self, ServiceError> {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            None => Ok(TenancyDocumentKind::PastTenantPdf),
            Some(kind) => TenancyDocumentKind::from_str(kind).map_err(|_| {
                ServiceError::ValidationError(format!("unknown document kind '{}'", kind))
            }),
        }
    }
}

fn looks_like_pdf(content: &[u8]) -> bool {
    content.starts_with(b"%PDF")
}

#[derive(Clone)]
pub struct TenancyService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    bucket: BucketHandle,
}

impl TenancyService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, bucket: BucketHandle) -> Self {
        Self {
            db_pool,
            event_sender,
            bucket,
        }
    }

    #[instrument(skip(self))]
    pub async fn list(&self, query: &TenancyQuery) -> Result<Vec<tenancy::Model>, ServiceError> {
        let mut select = tenancy::Entity::find();
        if let Some(active) = query.active {
            select = select.filter(tenancy::Column::IsActive.eq(active));
        }
        if let Some(flat_id) = query.flat_id.as_deref().filter(|f| !f.trim().is_empty()) {
            select = select.filter(tenancy::Column::FlatId.eq(flat_id.trim()));
        }
        Ok(select
            .order_by_desc(tenancy::Column::StartDate)
            .order_by_asc(tenancy::Column::TenantName)
            .all(self.db_pool.as_ref())
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<tenancy::Model, ServiceError> {
        tenancy::Entity::find_by_id(id)
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Tenancy {} not found", id)))
    }

    /// Moves a tenant into a flat. Fails with a conflict when the flat is already let.
    #[instrument(skip(self, command))]
    pub async fn create_active(&self, mut command: CreateTenancyCommand) -> Result<tenancy::Model, ServiceError> {
        command.is_active = true;
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    /// Records a tenant who has already left.
    #[instrument(skip(self, command))]
    pub async fn create_past(&self, mut command: CreateTenancyCommand) -> Result<tenancy::Model, ServiceError> {
        command.is_active = false;
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self, changes))]
    pub async fn update(&self, id: Uuid, changes: UpdateTenancyRequest) -> Result<tenancy::Model, ServiceError> {
        UpdateTenancyCommand {
            tenancy_id: id,
            changes,
        }
        .execute(self.db_pool.clone(), self.event_sender.clone())
        .await
    }

    #[instrument(skip(self))]
    pub async fn end(&self, command: EndTenancyCommand) -> Result<tenancy::Model, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let existing = self.get(id).await?;
        existing.delete(self.db_pool.as_ref()).await?;

        info!(tenancy_id = %id, "Tenancy deleted");
        self.event_sender.send_or_log(Event::TenancyDeleted(id));
        Ok(())
    }

    /// Uploads a file for a tenancy and stores its URL in the matching column.
    #[instrument(skip(self, content), fields(bytes = content.len()))]
    pub async fn upload_document(
        &self,
        id: Uuid,
        kind: TenancyDocumentKind,
        file_name: &str,
        content: Bytes,
    ) -> Result<tenancy::Model, ServiceError> {
        if content.is_empty() {
            return Err(ServiceError::ValidationError("file is empty".to_string()));
        }
        if kind == TenancyDocumentKind::PastTenantPdf && !looks_like_pdf(&content) {
            return Err(ServiceError::ValidationError(
                "past tenant documents must be PDF files".to_string(),
            ));
        }

        let existing = self.get(id).await?;
        let stored = match kind {
            TenancyDocumentKind::PastTenantPdf => {
                let path = format!(
                    "{}/{}_{}.pdf",
                    kind.folder(),
                    sanitize_file_name(&existing.flat_id),
                    Utc::now().timestamp_millis()
                );
                self.bucket.put(&path, content).await?
            }
            _ => {
                self.bucket
                    .put_timestamped(kind.folder(), &existing.flat_id, file_name, content)
                    .await?
            }
        };

        let url = stored.public_url.clone();
        let mut bachelor_urls: Vec<String> = existing
            .bachelors_aadhar_urls
            .clone()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();

        let mut active = existing.into_active_model();
        match kind {
            TenancyDocumentKind::PastTenantPdf => {
                active.pdf_url = Set(Some(url));
                active.pdf_uploaded_at = Set(Some(Utc::now()));
            }
            TenancyDocumentKind::Aadhar => active.aadhar_url = Set(Some(url)),
            TenancyDocumentKind::Pan => active.pan_url = Set(Some(url)),
            TenancyDocumentKind::OfferLetter => active.offer_letter_url = Set(Some(url)),
            TenancyDocumentKind::PartnerAadhar => active.partner_aadhar_url = Set(Some(url)),
            TenancyDocumentKind::BachelorAadhar => {
                bachelor_urls.push(url);
                active.bachelors_aadhar_urls = Set(Some(serde_json::json!(bachelor_urls)));
            }
        }

        match active.update(self.db_pool.as_ref()).await {
            Ok(updated) => {
                info!(tenancy_id = %id, kind = %kind, "Tenancy document stored");
                Ok(updated)
            }
            Err(e) => {
                self.bucket.discard(&stored.path).await;
                Err(e.into())
            }
        }
    }
}
