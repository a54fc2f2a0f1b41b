use chrono::Utc;
use skyway_core::account::User;
use skyway_core::booking::{
    count_seats, Booking, BookingOutcome, BookingStatus, CreateBookingRequest, FlightSegment, Passenger,
    PaymentStatus, UpdateBookingRequest,
};
use skyway_core::flight::Flight;
use skyway_core::identity::AuthenticatedUser;
use skyway_core::itinerary::{BookingDetails, Itinerary};
use skyway_core::repository::{
    BookingRepository, FlightCatalog, InventoryLedger, PaymentMethodRepository, UserRepository,
};
use skyway_core::{CabinClass, CoreError, CoreResult};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::changes::PassengerChanges;
use crate::fulfillment::SideEffectDispatcher;

/// Seats held by one segment of a booking.
#[derive(Debug, Clone, Copy)]
struct Reservation {
    flight_id: Uuid,
    cabin: CabinClass,
    seats: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Adjustment {
    Reserve,
    Release,
}

impl Adjustment {
    fn inverse(self) -> Self {
        match self {
            Adjustment::Reserve => Adjustment::Release,
            Adjustment::Release => Adjustment::Reserve,
        }
    }
}

/// Inventory moves paired with the booking-row write that commits or reverts them.
///
/// Each sequence runs on its own task (see [`detached`]), so a caller that gives up halfway
/// cannot leave seats held without a booking, or a cancelled booking still holding seats.
#[derive(Clone)]
struct SeatWriter {
    ledger: Arc<dyn InventoryLedger>,
    bookings: Arc<dyn BookingRepository>,
}

impl SeatWriter {
    /// Reserve every segment, then insert. A failed insert releases what was reserved.
    async fn reserve_and_insert(self, booking: Booking) -> CoreResult<Booking> {
        let reservations = reservations(&booking);
        self.adjust_all(&reservations, Adjustment::Reserve).await?;

        if let Err(e) = self.bookings.insert(&booking).await {
            error!(booking_id = %booking.id, error = %e, "Failed to persist booking, releasing seats");
            self.undo(&reservations, Adjustment::Reserve).await;
            return Err(e);
        }
        Ok(booking)
    }

    /// Claim the booking by moving it to CANCELLED, then release its seats.
    /// If the release fails the previous status is restored.
    async fn claim_and_release(
        self,
        booking_id: Uuid,
        previous: BookingStatus,
        reservations: Vec<Reservation>,
    ) -> CoreResult<()> {
        // A losing concurrent cancel must not release seats twice
        if !self
            .bookings
            .transition_status(booking_id, previous, BookingStatus::Cancelled)
            .await?
        {
            return Err(CoreError::InvalidState(format!(
                "Booking {} was modified concurrently",
                booking_id
            )));
        }

        if let Err(e) = self.adjust_all(&reservations, Adjustment::Release).await {
            error!(%booking_id, error = %e, "Failed to release seats, restoring booking status");
            match self
                .bookings
                .transition_status(booking_id, BookingStatus::Cancelled, previous)
                .await
            {
                Ok(true) => {}
                Ok(false) => error!(%booking_id, "Booking status changed while restoring it"),
                Err(restore) => error!(%booking_id, error = %restore, "Failed to restore booking status"),
            }
            return Err(e);
        }
        Ok(())
    }

    /// Apply every adjustment or none: on failure the ones already applied are reverted.
    async fn adjust_all(&self, reservations: &[Reservation], adjustment: Adjustment) -> CoreResult<()> {
        for (index, reservation) in reservations.iter().enumerate() {
            if let Err(e) = self.adjust(reservation, adjustment).await {
                self.undo(&reservations[..index], adjustment).await;
                return Err(e);
            }
        }
        Ok(())
    }

    /// Revert adjustments that were applied. Failures here can only be logged.
    async fn undo(&self, applied: &[Reservation], adjustment: Adjustment) {
        for reservation in applied {
            if let Err(e) = self.adjust(reservation, adjustment.inverse()).await {
                error!(
                    flight_id = %reservation.flight_id,
                    cabin = %reservation.cabin,
                    seats = reservation.seats,
                    error = %e,
                    "Compensating inventory adjustment failed"
                );
            }
        }
    }

    async fn adjust(&self, reservation: &Reservation, adjustment: Adjustment) -> CoreResult<u32> {
        let Reservation { flight_id, cabin, seats } = *reservation;
        match adjustment {
            Adjustment::Reserve => self.ledger.decrement(flight_id, cabin, seats).await,
            Adjustment::Release => self.ledger.increment(flight_id, cabin, seats).await,
        }
    }
}

/// Run `work` on its own task and wait for it. Dropping the returned future (client gone,
/// request timeout) detaches the task instead of cancelling it.
async fn detached<T, F>(work: F) -> CoreResult<T>
where
    F: Future<Output = CoreResult<T>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(work)
        .await
        .map_err(|e| CoreError::Storage(format!("Booking task aborted: {}", e)))?
}

/// Manages the booking lifecycle: create, passenger updates, cancellation and owner reads.
///
/// Seat inventory and booking rows move together. Every failure after seats were touched is
/// compensated before the error is returned, so a failed call leaves inventory as it found it.
/// Tickets, mail and events run after commit and never undo a committed change.
pub struct BookingManager {
    catalog: Arc<dyn FlightCatalog>,
    seats: SeatWriter,
    bookings: Arc<dyn BookingRepository>,
    users: Arc<dyn UserRepository>,
    payment_methods: Arc<dyn PaymentMethodRepository>,
    side_effects: SideEffectDispatcher,
}

impl BookingManager {
    pub fn new(
        catalog: Arc<dyn FlightCatalog>,
        ledger: Arc<dyn InventoryLedger>,
        bookings: Arc<dyn BookingRepository>,
        users: Arc<dyn UserRepository>,
        payment_methods: Arc<dyn PaymentMethodRepository>,
        side_effects: SideEffectDispatcher,
    ) -> Self {
        let seats = SeatWriter { ledger, bookings: bookings.clone() };
        Self { catalog, seats, bookings, users, payment_methods, side_effects }
    }

    /// Reserve seats on every segment, then persist the booking as CONFIRMED.
    pub async fn create(&self, caller: &AuthenticatedUser, request: CreateBookingRequest) -> CoreResult<BookingOutcome> {
        let seats = validate_create(&request)?;
        let customer = self.customer(caller).await?;

        if let Some(payment_method_id) = request.payment_method_id {
            if self.payment_methods.get(caller.user_id, payment_method_id).await?.is_none() {
                return Err(CoreError::NotFound("Payment method not found".to_string()));
            }
        }

        let mut flights = HashMap::new();
        for segment in &request.flight_segments {
            let flight = self.catalog.get_flight(segment.flight_id).await?;
            flights.insert(flight.id, flight);
        }

        let booking = new_booking(caller.user_id, request, seats);
        let writer = self.seats.clone();
        let booking = detached(writer.reserve_and_insert(booking)).await?;

        info!(
            booking_id = %booking.id,
            user_id = %caller.user_id,
            segments = booking.segments.len(),
            seats,
            "Booking confirmed"
        );

        let mut itinerary = Itinerary { booking, flights, customer };
        let side_effect_failures = self.side_effects.booking_confirmed(&mut itinerary).await;

        Ok(BookingOutcome { booking: itinerary.booking, side_effect_failures })
    }

    /// Edit passenger details. Never touches inventory.
    pub async fn update(
        &self,
        caller: &AuthenticatedUser,
        booking_id: Uuid,
        request: UpdateBookingRequest,
    ) -> CoreResult<BookingOutcome> {
        let booking = self.owned_booking(caller, booking_id).await?;
        ensure_mutable(&booking, "update")?;

        let changes = PassengerChanges::compute(&booking, &request.passengers)?;
        if changes.is_empty() {
            return Ok(BookingOutcome { booking, side_effect_failures: Vec::new() });
        }

        let mut itinerary = self.itinerary(booking).await?;
        self.bookings.update_passengers(booking_id, &changes.updated).await?;

        changes.apply(&mut itinerary.booking);
        itinerary.booking.updated_at = Utc::now();
        info!(%booking_id, changed = changes.updated.len(), "Booking passengers updated");

        let side_effect_failures = self
            .side_effects
            .booking_updated(&mut itinerary, &changes.change_set)
            .await;

        Ok(BookingOutcome { booking: itinerary.booking, side_effect_failures })
    }

    /// Move the booking to CANCELLED and give its seats back.
    pub async fn cancel(&self, caller: &AuthenticatedUser, booking_id: Uuid) -> CoreResult<BookingOutcome> {
        let booking = self.owned_booking(caller, booking_id).await?;
        ensure_mutable(&booking, "cancel")?;

        // Flights removed from the catalog must not block a cancellation
        let flights = self.known_flights(&booking).await?;
        let mut itinerary = self.itinerary_with(booking, flights).await?;
        let previous = itinerary.booking.status;

        let writer = self.seats.clone();
        let held = reservations(&itinerary.booking);
        detached(writer.claim_and_release(booking_id, previous, held)).await?;

        itinerary.booking.status = BookingStatus::Cancelled;
        itinerary.booking.updated_at = Utc::now();
        info!(%booking_id, "Booking cancelled");

        let side_effect_failures = self.side_effects.booking_cancelled(&mut itinerary).await;

        Ok(BookingOutcome { booking: itinerary.booking, side_effect_failures })
    }

    pub async fn get(&self, caller: &AuthenticatedUser, booking_id: Uuid) -> CoreResult<BookingDetails> {
        let booking = self.owned_booking(caller, booking_id).await?;
        let flights = self.known_flights(&booking).await?;
        Ok(BookingDetails::new(booking, &flights))
    }

    /// The caller's bookings, newest first.
    pub async fn list(&self, caller: &AuthenticatedUser) -> CoreResult<Vec<BookingDetails>> {
        let bookings = self.bookings.list_for_user(caller.user_id).await?;
        let mut details = Vec::with_capacity(bookings.len());
        for booking in bookings {
            let flights = self.known_flights(&booking).await?;
            details.push(BookingDetails::new(booking, &flights));
        }
        Ok(details)
    }

    async fn owned_booking(&self, caller: &AuthenticatedUser, booking_id: Uuid) -> CoreResult<Booking> {
        let booking = self
            .bookings
            .get(booking_id)
            .await?
            .ok_or_else(|| CoreError::booking_not_found(booking_id))?;

        if !caller.owns(booking.user_id) {
            warn!(%booking_id, caller = %caller.user_id, "Rejected access to another user's booking");
            return Err(CoreError::Forbidden("You do not have access to this booking".to_string()));
        }
        Ok(booking)
    }

    async fn customer(&self, caller: &AuthenticatedUser) -> CoreResult<User> {
        self.users
            .get(caller.user_id)
            .await?
            .ok_or_else(|| CoreError::NotFound("User not found".to_string()))
    }

    async fn itinerary(&self, booking: Booking) -> CoreResult<Itinerary> {
        let mut flights = HashMap::new();
        for segment in &booking.segments {
            let flight = self.catalog.get_flight(segment.flight_id).await?;
            flights.insert(flight.id, flight);
        }
        self.itinerary_with(booking, flights).await
    }

    async fn itinerary_with(&self, booking: Booking, flights: HashMap<Uuid, Flight>) -> CoreResult<Itinerary> {
        let customer = self.users.get(booking.user_id).await?.ok_or_else(|| {
            CoreError::NotFound(format!("Owner of booking {} not found", booking.id))
        })?;
        Ok(Itinerary { booking, flights, customer })
    }

    /// Flights still present in the catalog; reads tolerate removed flights.
    async fn known_flights(&self, booking: &Booking) -> CoreResult<HashMap<Uuid, Flight>> {
        let mut flights = HashMap::new();
        for segment in &booking.segments {
            match self.catalog.get_flight(segment.flight_id).await {
                Ok(flight) => {
                    flights.insert(flight.id, flight);
                }
                Err(CoreError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(flights)
    }
}

fn reservations(booking: &Booking) -> Vec<Reservation> {
    booking
        .segments
        .iter()
        .map(|s| Reservation { flight_id: s.flight_id, cabin: s.cabin_class, seats: s.seats })
        .collect()
}

fn ensure_mutable(booking: &Booking, action: &str) -> CoreResult<()> {
    if booking.status.is_terminal() {
        return Err(CoreError::InvalidState(format!(
            "Cannot {} booking {}: it is {}",
            action,
            booking.id,
            booking.status.as_str()
        )));
    }
    Ok(())
}

/// Checks the request shape and returns the seats every segment needs.
fn validate_create(request: &CreateBookingRequest) -> CoreResult<u32> {
    if request.passengers.is_empty() {
        return Err(CoreError::InvalidInput("A booking needs at least one passenger".to_string()));
    }
    if request
        .passengers
        .iter()
        .any(|p| p.first_name.trim().is_empty() || p.last_name.trim().is_empty())
    {
        return Err(CoreError::InvalidInput("Every passenger needs a first and last name".to_string()));
    }

    let seats = count_seats(request.passengers.iter().map(|p| p.passenger_type));
    if seats == 0 {
        return Err(CoreError::InvalidInput(
            "At least one passenger must occupy a seat".to_string(),
        ));
    }

    let outbound = request.flight_segments.iter().filter(|s| !s.is_return).count();
    let inbound = request.flight_segments.len() - outbound;
    let shape_ok = if request.is_round_trip {
        outbound == 1 && inbound == 1
    } else {
        outbound == 1 && inbound == 0
    };
    if !shape_ok {
        return Err(CoreError::InvalidInput(if request.is_round_trip {
            "A round trip needs exactly one outbound and one return segment".to_string()
        } else {
            "A one-way booking needs exactly one outbound segment".to_string()
        }));
    }

    let amounts_ok = request.total_amount.is_finite()
        && request.total_amount >= 0.0
        && request
            .flight_segments
            .iter()
            .all(|s| s.fare_amount.is_finite() && s.fare_amount >= 0.0);
    if !amounts_ok {
        return Err(CoreError::InvalidInput("Amounts must be non-negative".to_string()));
    }

    Ok(seats)
}

fn new_booking(user_id: Uuid, request: CreateBookingRequest, seats: u32) -> Booking {
    let id = Uuid::new_v4();
    let now = Utc::now();

    let segments = request
        .flight_segments
        .into_iter()
        .map(|s| FlightSegment {
            id: Uuid::new_v4(),
            booking_id: id,
            flight_id: s.flight_id,
            cabin_class: s.cabin_class,
            fare_amount: s.fare_amount,
            seats,
            is_return: s.is_return,
            ticket_url: None,
        })
        .collect();

    let passengers = request
        .passengers
        .into_iter()
        .map(|p| Passenger {
            id: Uuid::new_v4(),
            booking_id: id,
            first_name: p.first_name.trim().to_string(),
            last_name: p.last_name.trim().to_string(),
            date_of_birth: p.date_of_birth,
            nationality: p.nationality,
            passport_number: p.passport_number,
            passport_expiry: p.passport_expiry,
            passenger_type: p.passenger_type,
        })
        .collect();

    Booking {
        id,
        user_id,
        total_amount: request.total_amount,
        status: BookingStatus::Confirmed,
        payment_status: PaymentStatus::Completed,
        payment_method_id: request.payment_method_id,
        segments,
        passengers,
        created_at: now,
        updated_at: now,
    }
}
