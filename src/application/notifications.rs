//! Hand-off of committed events to the export / notification side.
//!
//! The forwarder runs as its own task. Whatever a sink does, the state
//! change that produced the event is already committed.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::events::{EventMessage, SharedEventBus};
use crate::shared::shutdown::ShutdownSignal;

#[derive(Debug, thiserror::Error)]
#[error("notification delivery failed: {0}")]
pub struct NotificationError(pub String);

/// Destination for published events (mailer, exporter, webhook...).
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, message: &EventMessage) -> Result<(), NotificationError>;
}

/// Writes every event to the log as JSON.
pub struct LoggingSink;

#[async_trait]
impl NotificationSink for LoggingSink {
    async fn deliver(&self, message: &EventMessage) -> Result<(), NotificationError> {
        let json =
            serde_json::to_string(message).map_err(|e| NotificationError(e.to_string()))?;
        info!(event_type = message.event.event_type(), payload = %json, "Notification");
        Ok(())
    }
}

/// Subscribe to `bus` and feed every event to `sink` until shutdown or
/// until the bus closes.
pub fn spawn_notification_forwarder(
    bus: SharedEventBus,
    sink: Arc<dyn NotificationSink>,
    shutdown: ShutdownSignal,
) -> JoinHandle<()> {
    let mut subscriber = bus.subscribe();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.wait() => {
                    info!("Notification forwarder stopping");
                    break;
                }
                event = subscriber.recv() => {
                    let Some(message) = event else {
                        warn!("Event bus closed");
                        break;
                    };
                    match sink.deliver(&message).await {
                        Ok(()) => debug!(event_id = %message.id, "Event delivered"),
                        Err(e) => warn!(
                            event_id = %message.id,
                            event_type = message.event.event_type(),
                            error = %e,
                            "Notification sink failed"
                        ),
                    }
                }
            }
        }
    })
}
