use uuid::Uuid;

/// Emitted after a booking row (with its segments and passengers) has been committed.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingConfirmedEvent {
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub segment_ids: Vec<Uuid>,
    pub seats: u32,
    pub total_amount: f64,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingUpdatedEvent {
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub changed_passenger_ids: Vec<Uuid>,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingCancelledEvent {
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub released_seats: u32,
    pub timestamp: i64,
}

/// Remaining seats in one cabin after a reservation or release.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct SeatAvailabilityEvent {
    pub flight_id: Uuid,
    pub cabin_class: String,
    pub available_seats: u32,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingEvent {
    BookingConfirmed(BookingConfirmedEvent),
    BookingUpdated(BookingUpdatedEvent),
    BookingCancelled(BookingCancelledEvent),
}

impl BookingEvent {
    pub fn booking_id(&self) -> Uuid {
        match self {
            BookingEvent::BookingConfirmed(e) => e.booking_id,
            BookingEvent::BookingUpdated(e) => e.booking_id,
            BookingEvent::BookingCancelled(e) => e.booking_id,
        }
    }

    pub fn topic(&self) -> &'static str {
        match self {
            BookingEvent::BookingConfirmed(_) => "booking.confirmed",
            BookingEvent::BookingUpdated(_) => "booking.updated",
            BookingEvent::BookingCancelled(_) => "booking.cancelled",
        }
    }
}
