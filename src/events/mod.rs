use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::webhooks::SheetSyncClient;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Queues an event without waiting for room in the channel.
    ///
    /// Domain writes have already committed by the time events are emitted,
    /// so a full or closed channel drops the event with a warning instead of
    /// holding up the request.
    pub fn send_or_log(&self, event: Event) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                metrics::counter!("rentdesk_events_dropped_total", 1);
                warn!(?event, "event channel full, dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                warn!(?event, "event loop is gone, dropping event");
            }
        }
    }
}

/// Things that happened in the domain, in the order they were committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    FlatCreated {
        flat_id: String,
        row: serde_json::Value,
    },
    FlatUpdated(String),
    FlatDeleted(String),
    PaymentStatusChanged {
        flat_id: String,
        status: String,
        paid_on: Option<chrono::NaiveDate>,
    },
    TenancyCreated {
        tenancy_id: Uuid,
        flat_id: String,
        is_active: bool,
    },
    TenancyUpdated(Uuid),
    TenancyEnded {
        tenancy_id: Uuid,
        flat_id: String,
    },
    TenancyDeleted(Uuid),
    MaintenanceRecorded {
        record_id: Uuid,
        flat_id: String,
    },
    DocumentUploaded {
        document_id: Uuid,
        flat_id: String,
        doc_type: String,
    },
    DocumentDeleted(Uuid),
    SettlementFinalized {
        tenancy_id: Uuid,
        refund: Decimal,
        at: DateTime<Utc>,
    },
}

/// Drains the event channel until every sender is dropped.
///
/// Inserted flats are forwarded to the spreadsheet mirror when one is
/// configured. Each push runs on its own task so a slow endpoint never
/// stalls the loop; a failed push is logged and dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>, sync: Option<SheetSyncClient>) {
    info!(
        sync_enabled = sync.is_some(),
        "Starting event processing loop"
    );

    while let Some(event) = rx.recv().await {
        debug!("Received event: {:?}", event);

        match event {
            Event::FlatCreated { flat_id, row } => {
                metrics::counter!("rentdesk_flats_created_total", 1);
                if let Some(client) = sync.clone() {
                    tokio::spawn(async move {
                        if let Err(e) = client.push_rows("flats", vec![row]).await {
                            warn!(flat_id = %flat_id, error = %e, "spreadsheet sync failed");
                        }
                    });
                }
            }
            Event::PaymentStatusChanged { flat_id, status, .. } => {
                info!(flat_id = %flat_id, status = %status, "payment status changed");
            }
            Event::TenancyEnded { tenancy_id, flat_id } => {
                info!(%tenancy_id, flat_id = %flat_id, "tenancy ended");
            }
            Event::SettlementFinalized { tenancy_id, refund, .. } => {
                metrics::counter!("rentdesk_settlements_total", 1);
                info!(%tenancy_id, %refund, "settlement finalized");
            }
            other => debug!("No handler for event {:?}", other),
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loop_stops_when_senders_are_dropped() {
        let (tx, rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let handle = tokio::spawn(process_events(rx, None));

        sender.send(Event::FlatDeleted("a-1".into())).await.unwrap();
        drop(sender);

        handle.await.unwrap();
    }

    #[tokio::test]
    async fn send_fails_once_the_loop_is_gone() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        assert!(sender.send(Event::FlatDeleted("a-1".into())).await.is_err());
        // Must not panic.
        sender.send_or_log(Event::FlatDeleted("a-1".into()));
    }

    #[tokio::test]
    async fn queueing_never_waits_on_a_full_channel() {
        let (tx, mut rx) = mpsc::channel(1);
        let sender = EventSender::new(tx);

        let queued = tokio::time::timeout(std::time::Duration::from_millis(200), async {
            sender.send_or_log(Event::FlatDeleted("a-1".into()));
            sender.send_or_log(Event::FlatDeleted("a-2".into()));
        })
        .await;
        assert!(queued.is_ok());

        match rx.recv().await {
            Some(Event::FlatDeleted(id)) => assert_eq!(id, "a-1"),
            other => panic!("unexpected event {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }
}
