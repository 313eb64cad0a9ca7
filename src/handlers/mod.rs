pub mod common;
pub mod documents;
pub mod flats;
pub mod maintenance;
pub mod settlements;
pub mod storage;
pub mod tenancies;

use crate::events::EventSender;
use crate::services::{
    DocumentService, FlatService, MaintenanceService, PaymentService, SettlementService,
    TenancyService,
};
use crate::storage::{BucketHandle, ObjectStore};
use crate::db::DbPool;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub flats: Arc<FlatService>,
    pub tenancies: Arc<TenancyService>,
    pub maintenance: Arc<MaintenanceService>,
    pub documents: Arc<DocumentService>,
    pub payments: Arc<PaymentService>,
    pub settlement: Arc<SettlementService>,
    pub storage: Arc<dyn ObjectStore>,
}

impl AppServices {
    /// Builds every service over one pool, event channel and store.
    /// File-bearing services share the `documents_bucket`.
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        storage: Arc<dyn ObjectStore>,
        documents_bucket: &str,
    ) -> Self {
        let bucket = BucketHandle::new(storage.clone(), documents_bucket);

        Self {
            flats: Arc::new(FlatService::new(db_pool.clone(), event_sender.clone())),
            tenancies: Arc::new(TenancyService::new(
                db_pool.clone(),
                event_sender.clone(),
                bucket.clone(),
            )),
            maintenance: Arc::new(MaintenanceService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            documents: Arc::new(DocumentService::new(
                db_pool.clone(),
                event_sender.clone(),
                bucket.clone(),
            )),
            payments: Arc::new(PaymentService::new(
                db_pool.clone(),
                event_sender.clone(),
                bucket.clone(),
            )),
            settlement: Arc::new(SettlementService::new(db_pool, event_sender, bucket)),
            storage,
        }
    }
}
