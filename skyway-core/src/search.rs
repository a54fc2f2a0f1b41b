use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::flight::Flight;

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TripType {
    #[default]
    OneWay,
    RoundTrip,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct PassengerCounts {
    #[serde(default = "default_adults")]
    pub adult: u32,
    #[serde(default)]
    pub child: u32,
    #[serde(default)]
    pub infant: u32,
}

fn default_adults() -> u32 {
    1
}

impl Default for PassengerCounts {
    fn default() -> Self {
        Self { adult: 1, child: 0, infant: 0 }
    }
}

impl PassengerCounts {
    /// Infants sit on a lap, so only adults and children need seats.
    pub fn seats_required(&self) -> u32 {
        self.adult + self.child
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightSearchRequest {
    pub from: String,
    pub to: String,
    pub departure_date: NaiveDate, // calendar day, matched in UTC
    pub return_date: Option<NaiveDate>,
    /// Free-form; unknown values are searched as economy.
    pub cabin_class: Option<String>,
    #[serde(default)]
    pub trip_type: TripType,
    #[serde(default)]
    pub passengers: PassengerCounts,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightOption {
    #[serde(flatten)]
    pub flight: Flight,
    pub remaining_seats: u32,
    pub price: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightSearchResult {
    pub outbound_flights: Vec<FlightOption>,
    pub return_flights: Vec<FlightOption>,
}

/// Storage-level route lookup. Departure window is `[departs_from, departs_before)`.
#[derive(Debug, Clone)]
pub struct RouteQuery {
    pub origin: String,
    pub destination: String,
    pub departs_from: DateTime<Utc>,
    pub departs_before: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_request_defaults() {
        let json = r#"
            {
                "from": "JFK",
                "to": "London",
                "departureDate": "2024-12-25"
            }
        "#;
        let req: FlightSearchRequest = serde_json::from_str(json).expect("Failed to deserialize");
        assert_eq!(req.trip_type, TripType::OneWay);
        assert_eq!(req.passengers.seats_required(), 1);
        assert_eq!(req.departure_date, NaiveDate::from_ymd_opt(2024, 12, 25).unwrap());
    }

    #[test]
    fn test_round_trip_deserialization() {
        let json = r#"
            {
                "from": "JFK",
                "to": "LHR",
                "departureDate": "2024-12-25",
                "returnDate": "2025-01-02",
                "tripType": "roundTrip",
                "cabinClass": "BUSINESS",
                "passengers": { "adult": 2, "child": 1, "infant": 1 }
            }
        "#;
        let req: FlightSearchRequest = serde_json::from_str(json).expect("Failed to deserialize");
        assert_eq!(req.trip_type, TripType::RoundTrip);
        assert_eq!(req.passengers.seats_required(), 3);
        assert!(req.return_date.is_some());
    }
}
