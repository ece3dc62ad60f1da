use std::sync::Arc;

use tokio::sync::mpsc;

use super::{AuditEventEnvelope, AuditHandle, AuditRecord, AuditStore};

/// Background task that receives audit events and writes them to storage
pub struct AuditWriter {
    rx: mpsc::Receiver<AuditEventEnvelope>,
    store: Arc<dyn AuditStore>,
}

impl AuditWriter {
    /// Create a new audit writer
    pub fn new(rx: mpsc::Receiver<AuditEventEnvelope>, store: Arc<dyn AuditStore>) -> Self {
        Self { rx, store }
    }

    /// Consume events until every [`AuditHandle`] has been dropped.
    /// Insert failures are logged and skipped.
    pub async fn run(mut self) {
        tracing::info!("Audit writer started");
        let mut written: u64 = 0;

        while let Some(AuditEventEnvelope { timestamp, event }) = self.rx.recv().await {
            let event_type = event.event_type();
            let campaign_id = event.campaign_id().map(String::from);
            let record = AuditRecord {
                id: 0,
                timestamp,
                event_type: event_type.to_string(),
                user_id: event.user_id().map(String::from),
                campaign_id: campaign_id.clone(),
                data: event,
            };

            match self.store.insert(&record) {
                Ok(_) => written += 1,
                Err(e) => tracing::error!(
                    event_type,
                    campaign_id = campaign_id.as_deref().unwrap_or("-"),
                    error = %e,
                    "Dropping audit event"
                ),
            }
        }

        tracing::info!(written, "Audit writer shutting down");
    }
}

/// Build the emitting handle and the writer that drains it.
///
/// `buffer_size` bounds the channel: [`AuditHandle::emit`] waits when it is
/// full, [`AuditHandle::try_emit`] drops the event instead. Spawn the writer
/// with `tokio::spawn(writer.run())`.
pub fn create_audit_system(
    store: Arc<dyn AuditStore>,
    buffer_size: usize,
) -> (AuditHandle, AuditWriter) {
    let (tx, rx) = mpsc::channel(buffer_size);
    (AuditHandle::new(tx), AuditWriter::new(rx, store))
}
