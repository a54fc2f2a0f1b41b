//! Builders and recording collaborators shared by the unit tests.

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use skyway_catalog::seed::{self, FlightBuilder};
use skyway_core::account::User;
use skyway_core::booking::{
    count_seats, Booking, BookingStatus, ChangeSet, FlightSegment, Passenger, PassengerType, PaymentStatus,
};
use skyway_core::events::BookingEventSink;
use skyway_core::itinerary::Itinerary;
use skyway_core::notification::Notifier;
use skyway_core::repository::BookingRepository;
use skyway_core::ticketing::Ticketing;
use skyway_core::{CabinClass, CoreError, CoreResult};
use skyway_shared::models::events::BookingEvent;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use crate::InMemoryBookingRepository;

pub fn user() -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        auth_id: format!("auth|{}", Uuid::new_v4()),
        email: "traveller@example.com".to_string(),
        first_name: Some("Ada".to_string()),
        last_name: Some("Lovelace".to_string()),
        phone: None,
        created_at: now,
        updated_at: now,
    }
}

fn passenger(booking_id: Uuid, index: usize, passenger_type: PassengerType) -> Passenger {
    Passenger {
        id: Uuid::new_v4(),
        booking_id,
        first_name: format!("Passenger{}", index),
        last_name: "Smith".to_string(),
        date_of_birth: None,
        nationality: Some("GB".to_string()),
        passport_number: None,
        passport_expiry: None,
        passenger_type,
    }
}

fn segment(booking_id: Uuid, flight_id: Uuid, seats: u32, is_return: bool) -> FlightSegment {
    FlightSegment {
        id: Uuid::new_v4(),
        booking_id,
        flight_id,
        cabin_class: CabinClass::Economy,
        fare_amount: 450.0,
        seats,
        is_return,
        ticket_url: None,
    }
}

pub fn booking_with_passengers(types: &[PassengerType]) -> Booking {
    let id = Uuid::new_v4();
    let now = Utc::now();
    Booking {
        id,
        user_id: Uuid::new_v4(),
        total_amount: 450.0,
        status: BookingStatus::Confirmed,
        payment_status: PaymentStatus::Completed,
        payment_method_id: None,
        segments: vec![segment(id, Uuid::new_v4(), count_seats(types.iter().copied()), false)],
        passengers: types.iter().enumerate().map(|(i, t)| passenger(id, i, *t)).collect(),
        created_at: now,
        updated_at: now,
    }
}

/// A confirmed booking (one-way or round trip JFK/LHR) joined with its flights and owner.
pub fn itinerary_for(types: &[PassengerType], round_trip: bool) -> Itinerary {
    let airports = seed::airports();
    let airlines = seed::airlines();
    let find = |code: &str| airports.iter().find(|a| a.code == code).cloned().unwrap();
    let departure = Utc.with_ymd_and_hms(2030, 6, 1, 10, 0, 0).unwrap();

    let outbound = FlightBuilder::new(&airlines[0], &find("JFK"), &find("LHR"), departure).build();
    let inbound = FlightBuilder::new(&airlines[0], &find("LHR"), &find("JFK"), departure + Duration::days(7)).build();

    let customer = user();
    let mut booking = booking_with_passengers(types);
    booking.user_id = customer.id;
    let seats = booking.seat_count();
    booking.segments = vec![segment(booking.id, outbound.id, seats, false)];
    if round_trip {
        booking.segments.push(segment(booking.id, inbound.id, seats, true));
    }

    let flights = HashMap::from([(outbound.id, outbound), (inbound.id, inbound)]);
    Itinerary { booking, flights, customer }
}

#[derive(Default)]
pub struct RecordingTicketing {
    fail: bool,
    generated: Mutex<Vec<(Uuid, Option<Uuid>)>>,
    deleted: Mutex<Vec<Uuid>>,
}

impl RecordingTicketing {
    pub fn failing() -> Self {
        Self { fail: true, ..Default::default() }
    }

    pub fn generated(&self) -> Vec<(Uuid, Option<Uuid>)> {
        self.generated.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<Uuid> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl Ticketing for RecordingTicketing {
    async fn generate(&self, itinerary: &Itinerary, segment_id: Option<Uuid>) -> CoreResult<String> {
        if self.fail {
            return Err(CoreError::Upstream("document renderer unavailable".to_string()));
        }
        let booking_id = itinerary.booking.id;
        self.generated.lock().unwrap().push((booking_id, segment_id));
        let name = segment_id.map(|s| s.to_string()).unwrap_or_else(|| "booking".to_string());
        Ok(format!("memory://tickets/{}/{}.txt", booking_id, name))
    }

    async fn delete(&self, segment_id: Uuid, _booking_id: Uuid) -> CoreResult<()> {
        if self.fail {
            return Err(CoreError::Upstream("document store unavailable".to_string()));
        }
        self.deleted.lock().unwrap().push(segment_id);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    fail: bool,
    sent: Mutex<Vec<&'static str>>,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self { fail: true, ..Default::default() }
    }

    pub fn sent(&self, kind: &str) -> usize {
        self.sent.lock().unwrap().iter().filter(|k| **k == kind).count()
    }

    fn record(&self, kind: &'static str) -> CoreResult<()> {
        if self.fail {
            return Err(CoreError::Upstream("smtp relay refused connection".to_string()));
        }
        self.sent.lock().unwrap().push(kind);
        Ok(())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_confirmation(&self, _: &str, _: &str, _: &Itinerary, _: Option<&str>) -> CoreResult<()> {
        self.record("confirmation")
    }

    async fn send_update(&self, _: &str, _: &str, _: &Itinerary, _: &ChangeSet, _: Option<&str>) -> CoreResult<()> {
        self.record("update")
    }

    async fn send_cancellation(&self, _: &str, _: &str, _: &Itinerary) -> CoreResult<()> {
        self.record("cancellation")
    }
}

#[derive(Default)]
pub struct RecordingEvents {
    events: Mutex<Vec<BookingEvent>>,
}

impl RecordingEvents {
    pub fn topics(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(|e| e.topic()).collect()
    }
}

#[async_trait]
impl BookingEventSink for RecordingEvents {
    async fn publish(&self, event: &BookingEvent) -> CoreResult<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Booking store whose writes can be switched to fail, for exercising compensation.
#[derive(Default)]
pub struct FlakyBookingRepository {
    pub inner: InMemoryBookingRepository,
    pub fail_insert: AtomicBool,
    pub fail_transition: AtomicBool,
    /// Milliseconds every insert waits before writing.
    pub insert_delay_ms: AtomicU64,
}

#[async_trait]
impl BookingRepository for FlakyBookingRepository {
    async fn insert(&self, booking: &Booking) -> CoreResult<()> {
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(CoreError::Storage("connection reset during insert".to_string()));
        }
        let delay = self.insert_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
        }
        self.inner.insert(booking).await
    }

    async fn get(&self, id: Uuid) -> CoreResult<Option<Booking>> {
        self.inner.get(id).await
    }

    async fn list_for_user(&self, user_id: Uuid) -> CoreResult<Vec<Booking>> {
        self.inner.list_for_user(user_id).await
    }

    async fn update_passengers(&self, booking_id: Uuid, passengers: &[Passenger]) -> CoreResult<()> {
        self.inner.update_passengers(booking_id, passengers).await
    }

    async fn set_ticket_url(&self, segment_id: Uuid, ticket_url: Option<&str>) -> CoreResult<()> {
        self.inner.set_ticket_url(segment_id, ticket_url).await
    }

    async fn transition_status(&self, id: Uuid, from: BookingStatus, to: BookingStatus) -> CoreResult<bool> {
        if self.fail_transition.load(Ordering::SeqCst) {
            return Err(CoreError::Storage("connection reset during update".to_string()));
        }
        self.inner.transition_status(id, from, to).await
    }
}
