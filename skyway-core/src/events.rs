use async_trait::async_trait;
use skyway_shared::models::events::BookingEvent;

use crate::CoreResult;

#[async_trait]
pub trait BookingEventSink: Send + Sync {
    async fn publish(&self, event: &BookingEvent) -> CoreResult<()>;
}
