use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::account::User;
use crate::booking::{Booking, FlightSegment, PassengerType};
use crate::flight::Flight;
use crate::search::PassengerCounts;

/// A booking joined with its flights and customer: what tickets and emails are rendered from.
#[derive(Debug, Clone, Serialize)]
pub struct Itinerary {
    pub booking: Booking,
    pub flights: HashMap<Uuid, Flight>,
    pub customer: User,
}

impl Itinerary {
    pub fn flight_for(&self, segment: &FlightSegment) -> Option<&Flight> {
        self.flights.get(&segment.flight_id)
    }

    /// A copy restricted to a single segment, used for per-leg tickets and mails.
    pub fn for_segment(&self, segment_id: Uuid) -> Itinerary {
        let mut booking = self.booking.clone();
        booking.segments.retain(|s| s.id == segment_id);
        Itinerary {
            booking,
            flights: self.flights.clone(),
            customer: self.customer.clone(),
        }
    }

    /// "JFK to LHR" for the first segment, used in mail subjects.
    pub fn headline(&self) -> String {
        self.booking
            .segments
            .first()
            .and_then(|s| self.flight_for(s))
            .map(|f| f.route_label())
            .unwrap_or_else(|| format!("Booking {}", self.booking.id))
    }
}

/// Read projection of a booking for its owner.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetails {
    #[serde(flatten)]
    pub booking: Booking,
    pub outbound_flight: Option<Flight>,
    pub return_flight: Option<Flight>,
    pub passenger_counts: PassengerCounts,
}

impl BookingDetails {
    pub fn new(booking: Booking, flights: &HashMap<Uuid, Flight>) -> Self {
        let lookup = |segment: Option<&FlightSegment>| segment.and_then(|s| flights.get(&s.flight_id)).cloned();
        let outbound_flight = lookup(booking.outbound_segment());
        let return_flight = lookup(booking.return_segment());

        let mut passenger_counts = PassengerCounts { adult: 0, child: 0, infant: 0 };
        for passenger in &booking.passengers {
            match passenger.passenger_type {
                PassengerType::Adult => passenger_counts.adult += 1,
                PassengerType::Child => passenger_counts.child += 1,
                PassengerType::Infant => passenger_counts.infant += 1,
            }
        }

        Self { booking, outbound_flight, return_flight, passenger_counts }
    }
}
