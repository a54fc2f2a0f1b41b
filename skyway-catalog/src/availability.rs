use async_trait::async_trait;
use chrono::Utc;
use skyway_core::repository::InventoryLedger;
use skyway_core::{CabinClass, CoreResult};
use skyway_shared::models::events::SeatAvailabilityEvent;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Wraps a ledger and announces the remaining seats after every successful adjustment.
///
/// Subscribers that fall behind lose the oldest updates; nothing here waits on them.
pub struct BroadcastingLedger {
    inner: Arc<dyn InventoryLedger>,
    updates: broadcast::Sender<SeatAvailabilityEvent>,
}

impl BroadcastingLedger {
    pub fn new(inner: Arc<dyn InventoryLedger>, updates: broadcast::Sender<SeatAvailabilityEvent>) -> Self {
        Self { inner, updates }
    }

    fn announce(&self, flight_id: Uuid, cabin: CabinClass, available_seats: u32) {
        let event = SeatAvailabilityEvent {
            flight_id,
            cabin_class: cabin.as_str().to_string(),
            available_seats,
            timestamp: Utc::now().timestamp(),
        };
        // Err only means nobody is listening
        if self.updates.send(event).is_err() {
            tracing::trace!(%flight_id, %cabin, "No seat availability subscribers");
        }
    }
}

#[async_trait]
impl InventoryLedger for BroadcastingLedger {
    async fn decrement(&self, flight_id: Uuid, cabin: CabinClass, count: u32) -> CoreResult<u32> {
        let remaining = self.inner.decrement(flight_id, cabin, count).await?;
        self.announce(flight_id, cabin, remaining);
        Ok(remaining)
    }

    async fn increment(&self, flight_id: Uuid, cabin: CabinClass, count: u32) -> CoreResult<u32> {
        let remaining = self.inner.increment(flight_id, cabin, count).await?;
        self.announce(flight_id, cabin, remaining);
        Ok(remaining)
    }

    async fn available_seats(&self, flight_id: Uuid, cabin: CabinClass) -> CoreResult<u32> {
        self.inner.available_seats(flight_id, cabin).await
    }
}
