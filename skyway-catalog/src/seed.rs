//! Reference airports, airlines and a flight builder for development databases and tests.

use chrono::{DateTime, Duration, Utc};
use skyway_core::flight::{Airline, Airport, Flight, FlightStatus, PerCabin};
use uuid::Uuid;

pub fn airport(code: &str, name: &str, city: &str, country: &str) -> Airport {
    Airport {
        id: Uuid::new_v4(),
        code: code.to_string(),
        name: name.to_string(),
        city: city.to_string(),
        country: country.to_string(),
    }
}

pub fn airports() -> Vec<Airport> {
    vec![
        airport("ATL", "Hartsfield-Jackson Atlanta International Airport", "Atlanta", "USA"),
        airport("JFK", "John F. Kennedy International Airport", "New York", "USA"),
        airport("LAX", "Los Angeles International Airport", "Los Angeles", "USA"),
        airport("LHR", "London Heathrow Airport", "London", "United Kingdom"),
        airport("CDG", "Paris Charles de Gaulle Airport", "Paris", "France"),
        airport("DXB", "Dubai International Airport", "Dubai", "UAE"),
        airport("HND", "Tokyo Haneda Airport", "Tokyo", "Japan"),
        airport("FRA", "Frankfurt Airport", "Frankfurt", "Germany"),
    ]
}

pub fn airlines() -> Vec<Airline> {
    vec![
        Airline { id: Uuid::new_v4(), code: "BA".to_string(), name: "British Airways".to_string() },
        Airline { id: Uuid::new_v4(), code: "DL".to_string(), name: "Delta Air Lines".to_string() },
        Airline { id: Uuid::new_v4(), code: "EK".to_string(), name: "Emirates".to_string() },
    ]
}

/// Builds a scheduled flight with sensible default capacities and fares.
pub struct FlightBuilder {
    flight: Flight,
}

impl FlightBuilder {
    pub fn new(airline: &Airline, from: &Airport, to: &Airport, departure: DateTime<Utc>) -> Self {
        Self {
            flight: Flight {
                id: Uuid::new_v4(),
                flight_number: format!("{}{}", airline.code, 100 + (departure.timestamp() % 900)),
                airline: airline.clone(),
                departure_airport: from.clone(),
                arrival_airport: to.clone(),
                departure_time: departure,
                arrival_time: departure + Duration::hours(7),
                capacity: PerCabin { economy: 150, premium_economy: 40, business: 20, first: 8 },
                prices: PerCabin { economy: 450.0, premium_economy: 900.0, business: 2400.0, first: 6000.0 },
                status: FlightStatus::Scheduled,
            },
        }
    }

    pub fn duration(mut self, hours: i64) -> Self {
        self.flight.arrival_time = self.flight.departure_time + Duration::hours(hours);
        self
    }

    pub fn capacity(mut self, capacity: PerCabin<u32>) -> Self {
        self.flight.capacity = capacity;
        self
    }

    pub fn economy_seats(mut self, seats: u32) -> Self {
        self.flight.capacity.economy = seats;
        self
    }

    pub fn flight_number(mut self, number: &str) -> Self {
        self.flight.flight_number = number.to_string();
        self
    }

    pub fn build(self) -> Flight {
        self.flight
    }
}
