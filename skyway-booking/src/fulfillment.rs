use chrono::Utc;
use skyway_core::booking::{ChangeSet, SideEffectFailure, SideEffectKind};
use skyway_core::events::BookingEventSink;
use skyway_core::itinerary::Itinerary;
use skyway_core::notification::Notifier;
use skyway_core::repository::BookingRepository;
use skyway_core::ticketing::Ticketing;
use skyway_core::CoreError;
use skyway_shared::models::events::{
    BookingCancelledEvent, BookingConfirmedEvent, BookingEvent, BookingUpdatedEvent,
};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Runs the post-commit work for a booking: ticket documents, customer mail and lifecycle events.
///
/// Nothing here can fail the booking. Every failed step is logged and returned so the caller
/// can report a partial success.
pub struct SideEffectDispatcher {
    ticketing: Arc<dyn Ticketing>,
    notifier: Arc<dyn Notifier>,
    events: Arc<dyn BookingEventSink>,
    bookings: Arc<dyn BookingRepository>,
}

impl SideEffectDispatcher {
    pub fn new(
        ticketing: Arc<dyn Ticketing>,
        notifier: Arc<dyn Notifier>,
        events: Arc<dyn BookingEventSink>,
        bookings: Arc<dyn BookingRepository>,
    ) -> Self {
        Self { ticketing, notifier, events, bookings }
    }

    /// One ticket and one confirmation mail per segment, then `BookingConfirmed`.
    pub async fn booking_confirmed(&self, itinerary: &mut Itinerary) -> Vec<SideEffectFailure> {
        let mut failures = Vec::new();
        let email = itinerary.customer.email.clone();
        let name = itinerary.customer.display_name();

        for segment_id in segment_ids(itinerary) {
            let url = self.issue_ticket(itinerary, segment_id, &mut failures).await;
            let leg = itinerary.for_segment(segment_id);
            if let Err(e) = self
                .notifier
                .send_confirmation(&email, &name, &leg, url.as_deref())
                .await
            {
                record(&mut failures, SideEffectKind::Notification, Some(segment_id), e);
            }
        }

        let booking = &itinerary.booking;
        self.publish(
            BookingEvent::BookingConfirmed(BookingConfirmedEvent {
                booking_id: booking.id,
                user_id: booking.user_id,
                segment_ids: segment_ids(itinerary),
                seats: booking.seat_count(),
                total_amount: booking.total_amount,
                timestamp: Utc::now().timestamp(),
            }),
            &mut failures,
        )
        .await;

        failures
    }

    /// Regenerate every ticket with the new passenger details and mail the diff per segment.
    pub async fn booking_updated(&self, itinerary: &mut Itinerary, changes: &ChangeSet) -> Vec<SideEffectFailure> {
        let mut failures = Vec::new();
        let email = itinerary.customer.email.clone();
        let name = itinerary.customer.display_name();

        for segment_id in segment_ids(itinerary) {
            let url = self.issue_ticket(itinerary, segment_id, &mut failures).await;
            let leg = itinerary.for_segment(segment_id);
            if let Err(e) = self
                .notifier
                .send_update(&email, &name, &leg, changes, url.as_deref())
                .await
            {
                record(&mut failures, SideEffectKind::Notification, Some(segment_id), e);
            }
        }

        let booking = &itinerary.booking;
        self.publish(
            BookingEvent::BookingUpdated(BookingUpdatedEvent {
                booking_id: booking.id,
                user_id: booking.user_id,
                changed_passenger_ids: changes.passengers.iter().map(|c| c.id).collect(),
                timestamp: Utc::now().timestamp(),
            }),
            &mut failures,
        )
        .await;

        failures
    }

    /// Remove ticket documents, clear their URLs and send one cancellation mail.
    pub async fn booking_cancelled(&self, itinerary: &mut Itinerary) -> Vec<SideEffectFailure> {
        let mut failures = Vec::new();
        let booking_id = itinerary.booking.id;

        for segment_id in segment_ids(itinerary) {
            if let Err(e) = self.ticketing.delete(segment_id, booking_id).await {
                record(&mut failures, SideEffectKind::TicketDeletion, Some(segment_id), e);
                continue;
            }

            let had_url = itinerary
                .booking
                .segment(segment_id)
                .is_some_and(|s| s.ticket_url.is_some());
            if had_url {
                match self.bookings.set_ticket_url(segment_id, None).await {
                    Ok(()) => set_segment_url(itinerary, segment_id, None),
                    Err(e) => record(&mut failures, SideEffectKind::TicketUrlUpdate, Some(segment_id), e),
                }
            }
        }

        let email = itinerary.customer.email.clone();
        let name = itinerary.customer.display_name();
        if let Err(e) = self.notifier.send_cancellation(&email, &name, itinerary).await {
            record(&mut failures, SideEffectKind::Notification, None, e);
        }

        let booking = &itinerary.booking;
        self.publish(
            BookingEvent::BookingCancelled(BookingCancelledEvent {
                booking_id: booking.id,
                user_id: booking.user_id,
                released_seats: booking.reserved_seats(),
                timestamp: Utc::now().timestamp(),
            }),
            &mut failures,
        )
        .await;

        failures
    }

    /// Render and store the segment's ticket, then persist its URL.
    /// Returns the URL whenever a document exists, even if persisting the URL failed.
    async fn issue_ticket(
        &self,
        itinerary: &mut Itinerary,
        segment_id: Uuid,
        failures: &mut Vec<SideEffectFailure>,
    ) -> Option<String> {
        let leg = itinerary.for_segment(segment_id);
        let url = match self.ticketing.generate(&leg, Some(segment_id)).await {
            Ok(url) => url,
            Err(e) => {
                record(failures, SideEffectKind::TicketGeneration, Some(segment_id), e);
                return None;
            }
        };

        let unchanged = itinerary
            .booking
            .segment(segment_id)
            .is_some_and(|s| s.ticket_url.as_deref() == Some(url.as_str()));
        if !unchanged {
            match self.bookings.set_ticket_url(segment_id, Some(&url)).await {
                Ok(()) => set_segment_url(itinerary, segment_id, Some(url.clone())),
                Err(e) => record(failures, SideEffectKind::TicketUrlUpdate, Some(segment_id), e),
            }
        }

        info!(booking_id = %itinerary.booking.id, %segment_id, %url, "Ticket issued");
        Some(url)
    }

    async fn publish(&self, event: BookingEvent, failures: &mut Vec<SideEffectFailure>) {
        if let Err(e) = self.events.publish(&event).await {
            record(failures, SideEffectKind::EventPublish, None, e);
        }
    }
}

fn segment_ids(itinerary: &Itinerary) -> Vec<Uuid> {
    itinerary.booking.segments.iter().map(|s| s.id).collect()
}

fn set_segment_url(itinerary: &mut Itinerary, segment_id: Uuid, url: Option<String>) {
    if let Some(segment) = itinerary.booking.segments.iter_mut().find(|s| s.id == segment_id) {
        segment.ticket_url = url;
    }
}

fn record(failures: &mut Vec<SideEffectFailure>, kind: SideEffectKind, segment_id: Option<Uuid>, error: CoreError) {
    warn!(?kind, ?segment_id, error = %error, "Post-commit side effect failed");
    failures.push(SideEffectFailure { kind, segment_id, message: error.to_string() });
}
