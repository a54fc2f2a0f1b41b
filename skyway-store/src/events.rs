use async_trait::async_trait;
use skyway_core::events::BookingEventSink;
use skyway_core::{CoreError, CoreResult};
use skyway_shared::models::events::BookingEvent;
use tracing::info;

/// Publishes booking events as structured log records. Downstream consumers tail the log
/// stream instead of a broker.
#[derive(Clone, Default)]
pub struct TracingEventSink;

impl TracingEventSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BookingEventSink for TracingEventSink {
    async fn publish(&self, event: &BookingEvent) -> CoreResult<()> {
        let payload = serde_json::to_string(event)
            .map_err(|e| CoreError::Upstream(format!("Failed to encode {} event: {}", event.topic(), e)))?;

        info!(
            topic = event.topic(),
            booking_id = %event.booking_id(),
            payload = %payload,
            "Booking event published"
        );
        Ok(())
    }
}
