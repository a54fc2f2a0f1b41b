use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use skyway_shared::Masked;
use std::str::FromStr;
use uuid::Uuid;

use crate::flight::CabinClass;
use crate::CoreError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::Completed => "COMPLETED",
        }
    }

    /// Cancelled and completed bookings no longer accept updates or cancellation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Cancelled | BookingStatus::Completed)
    }
}

impl FromStr for BookingStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(BookingStatus::Pending),
            "CONFIRMED" => Ok(BookingStatus::Confirmed),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            "COMPLETED" => Ok(BookingStatus::Completed),
            other => Err(CoreError::InvalidInput(format!("Invalid booking status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PaymentStatus::Pending),
            "COMPLETED" => Ok(PaymentStatus::Completed),
            "FAILED" => Ok(PaymentStatus::Failed),
            "REFUNDED" => Ok(PaymentStatus::Refunded),
            other => Err(CoreError::InvalidInput(format!("Invalid payment status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PassengerType {
    #[default]
    Adult,
    Child,
    Infant,
}

impl PassengerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PassengerType::Adult => "ADULT",
            PassengerType::Child => "CHILD",
            PassengerType::Infant => "INFANT",
        }
    }

    /// Infants travel on a lap and do not consume a seat.
    pub fn occupies_seat(&self) -> bool {
        !matches!(self, PassengerType::Infant)
    }
}

impl FromStr for PassengerType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADULT" => Ok(PassengerType::Adult),
            "CHILD" => Ok(PassengerType::Child),
            "INFANT" => Ok(PassengerType::Infant),
            other => Err(CoreError::InvalidInput(format!("Invalid passenger type: {}", other))),
        }
    }
}

/// The aggregate root: a booking exclusively owns its segments and passengers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_amount: f64,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub payment_method_id: Option<Uuid>,
    pub segments: Vec<FlightSegment>,
    pub passengers: Vec<Passenger>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Seat-occupying passengers as they are now. Passenger edits can move this away from
    /// what the segments reserved, so inventory always goes by `FlightSegment::seats`.
    pub fn seat_count(&self) -> u32 {
        count_seats(self.passengers.iter().map(|p| p.passenger_type))
    }

    /// Seats held across all segments.
    pub fn reserved_seats(&self) -> u32 {
        self.segments.iter().map(|s| s.seats).sum()
    }

    pub fn outbound_segment(&self) -> Option<&FlightSegment> {
        self.segments.iter().find(|s| !s.is_return)
    }

    pub fn return_segment(&self) -> Option<&FlightSegment> {
        self.segments.iter().find(|s| s.is_return)
    }

    pub fn segment(&self, segment_id: Uuid) -> Option<&FlightSegment> {
        self.segments.iter().find(|s| s.id == segment_id)
    }

    pub fn is_round_trip(&self) -> bool {
        self.return_segment().is_some()
    }
}

pub fn count_seats(types: impl IntoIterator<Item = PassengerType>) -> u32 {
    types.into_iter().filter(|t| t.occupies_seat()).count() as u32
}

/// One directional leg of a booking on a single flight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlightSegment {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub flight_id: Uuid,
    pub cabin_class: CabinClass,
    pub fare_amount: f64,
    /// Seats reserved on the flight when the booking was created.
    pub seats: u32,
    pub is_return: bool,
    pub ticket_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Passenger {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub nationality: Option<String>,
    pub passport_number: Option<Masked<String>>,
    pub passport_expiry: Option<NaiveDate>,
    pub passenger_type: PassengerType,
}

impl Passenger {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    pub fn fields(&self) -> PassengerFields {
        PassengerFields {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            nationality: self.nationality.clone(),
            passenger_type: self.passenger_type,
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassengerDetails {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub nationality: Option<String>,
    pub passport_number: Option<Masked<String>>,
    pub passport_expiry: Option<NaiveDate>,
    #[serde(default, alias = "type")]
    pub passenger_type: PassengerType,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentRequest {
    pub flight_id: Uuid,
    pub cabin_class: CabinClass,
    pub fare_amount: f64,
    #[serde(default)]
    pub is_return: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub passengers: Vec<PassengerDetails>,
    pub total_amount: f64,
    pub payment_method_id: Option<Uuid>,
    pub flight_segments: Vec<SegmentRequest>,
    #[serde(default)]
    pub is_round_trip: bool,
}

/// Passenger edit keyed by an existing passenger id. A missing `passenger_type` keeps the old value.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassengerUpdate {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub nationality: Option<String>,
    #[serde(alias = "type")]
    pub passenger_type: Option<PassengerType>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBookingRequest {
    #[serde(default)]
    pub passengers: Vec<PassengerUpdate>,
}

// ============================================================================
// Change tracking
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PassengerFields {
    pub first_name: String,
    pub last_name: String,
    pub nationality: Option<String>,
    pub passenger_type: PassengerType,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PassengerChange {
    pub id: Uuid,
    pub old_data: PassengerFields,
    pub new_data: PassengerFields,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChangeSet {
    pub passengers: Vec<PassengerChange>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.passengers.is_empty()
    }
}

// ============================================================================
// Results
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SideEffectKind {
    TicketGeneration,
    TicketDeletion,
    TicketUrlUpdate,
    Notification,
    EventPublish,
}

/// A post-commit action that failed. The booking itself is valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SideEffectFailure {
    pub kind: SideEffectKind,
    pub segment_id: Option<Uuid>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingOutcome {
    pub booking: Booking,
    pub side_effect_failures: Vec<SideEffectFailure>,
}

impl BookingOutcome {
    pub fn is_partial(&self) -> bool {
        !self.side_effect_failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(!BookingStatus::Pending.is_terminal());
        assert!(!BookingStatus::Confirmed.is_terminal());
        assert!(BookingStatus::Cancelled.is_terminal());
        assert!(BookingStatus::Completed.is_terminal());
    }

    #[test]
    fn test_infants_do_not_count_as_seats() {
        let seats = count_seats([PassengerType::Adult, PassengerType::Child, PassengerType::Infant]);
        assert_eq!(seats, 2);
    }

    #[test]
    fn test_create_request_deserialization() {
        let json = r#"
            {
                "totalAmount": 420.5,
                "isRoundTrip": false,
                "flightSegments": [
                    { "flightId": "7d3f3a52-5f0e-4a4a-9b59-1e0a6b3f2c11", "cabinClass": "ECONOMY", "fareAmount": 420.5 }
                ],
                "passengers": [
                    { "firstName": "Ada", "lastName": "Lovelace", "type": "ADULT", "passportNumber": "P123" },
                    { "firstName": "Byron", "lastName": "King" }
                ]
            }
        "#;
        let req: CreateBookingRequest = serde_json::from_str(json).expect("Failed to deserialize");
        assert_eq!(req.flight_segments.len(), 1);
        assert!(!req.flight_segments[0].is_return);
        assert_eq!(req.passengers[1].passenger_type, PassengerType::Adult);
        assert_eq!(req.passengers[0].passport_number.as_ref().map(|p| p.expose().as_str()), Some("P123"));
        assert!(req.payment_method_id.is_none());
    }
}
