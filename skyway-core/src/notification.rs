use async_trait::async_trait;

use crate::booking::ChangeSet;
use crate::itinerary::Itinerary;
use crate::CoreResult;

/// Transactional customer messages. Callers treat every method as best-effort.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_confirmation(
        &self,
        email: &str,
        name: &str,
        itinerary: &Itinerary,
        document_url: Option<&str>,
    ) -> CoreResult<()>;

    async fn send_update(
        &self,
        email: &str,
        name: &str,
        itinerary: &Itinerary,
        changes: &ChangeSet,
        document_url: Option<&str>,
    ) -> CoreResult<()>;

    async fn send_cancellation(&self, email: &str, name: &str, itinerary: &Itinerary) -> CoreResult<()>;
}
