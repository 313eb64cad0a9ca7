pub mod sheet_sync;

pub use sheet_sync::{SheetSyncClient, SyncPayload};
