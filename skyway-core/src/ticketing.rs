use async_trait::async_trait;
use uuid::Uuid;

use crate::itinerary::Itinerary;
use crate::CoreResult;

/// Produces and removes persisted ticket documents.
#[async_trait]
pub trait Ticketing: Send + Sync {
    /// Render a ticket for one segment (or the whole booking when `segment_id` is `None`),
    /// store it, and return its reference URL. Regenerating overwrites the previous document.
    async fn generate(&self, itinerary: &Itinerary, segment_id: Option<Uuid>) -> CoreResult<String>;

    /// Remove a stale document. Missing documents are not an error.
    async fn delete(&self, segment_id: Uuid, booking_id: Uuid) -> CoreResult<()>;
}
