use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::CoreError;

/// Fare tier. Every tier carries its own seat inventory and price on a flight.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CabinClass {
    Economy,
    PremiumEconomy,
    Business,
    First,
}

impl CabinClass {
    pub const ALL: [CabinClass; 4] = [
        CabinClass::Economy,
        CabinClass::PremiumEconomy,
        CabinClass::Business,
        CabinClass::First,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CabinClass::Economy => "ECONOMY",
            CabinClass::PremiumEconomy => "PREMIUM_ECONOMY",
            CabinClass::Business => "BUSINESS",
            CabinClass::First => "FIRST",
        }
    }

    /// Lenient parse used by search: anything unrecognised falls back to economy.
    pub fn parse_or_economy(value: Option<&str>) -> Self {
        value
            .and_then(|v| v.parse().ok())
            .unwrap_or(CabinClass::Economy)
    }
}

impl fmt::Display for CabinClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CabinClass {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace([' ', '-'], "_").as_str() {
            "ECONOMY" => Ok(CabinClass::Economy),
            "PREMIUM_ECONOMY" | "PREMIUM" => Ok(CabinClass::PremiumEconomy),
            "BUSINESS" => Ok(CabinClass::Business),
            "FIRST" | "FIRST_CLASS" => Ok(CabinClass::First),
            other => Err(CoreError::InvalidInput(format!("Invalid cabin class: {}", other))),
        }
    }
}

/// One value per cabin class; a closed mapping instead of dynamic column lookup.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PerCabin<T> {
    pub economy: T,
    pub premium_economy: T,
    pub business: T,
    pub first: T,
}

impl<T: Copy> PerCabin<T> {
    pub fn get(&self, cabin: CabinClass) -> T {
        match cabin {
            CabinClass::Economy => self.economy,
            CabinClass::PremiumEconomy => self.premium_economy,
            CabinClass::Business => self.business,
            CabinClass::First => self.first,
        }
    }

    pub fn get_mut(&mut self, cabin: CabinClass) -> &mut T {
        match cabin {
            CabinClass::Economy => &mut self.economy,
            CabinClass::PremiumEconomy => &mut self.premium_economy,
            CabinClass::Business => &mut self.business,
            CabinClass::First => &mut self.first,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlightStatus {
    Scheduled,
    Delayed,
    Departed,
    Arrived,
    Cancelled,
}

impl FlightStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlightStatus::Scheduled => "SCHEDULED",
            FlightStatus::Delayed => "DELAYED",
            FlightStatus::Departed => "DEPARTED",
            FlightStatus::Arrived => "ARRIVED",
            FlightStatus::Cancelled => "CANCELLED",
        }
    }
}

impl FromStr for FlightStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SCHEDULED" => Ok(FlightStatus::Scheduled),
            "DELAYED" => Ok(FlightStatus::Delayed),
            "DEPARTED" => Ok(FlightStatus::Departed),
            "ARRIVED" => Ok(FlightStatus::Arrived),
            "CANCELLED" => Ok(FlightStatus::Cancelled),
            other => Err(CoreError::InvalidInput(format!("Invalid flight status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Airport {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub city: String,
    pub country: String,
}

impl Airport {
    /// Case-insensitive containment against IATA code, name or city.
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return false;
        }
        [&self.code, &self.name, &self.city]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Airline {
    pub id: Uuid,
    pub code: String,
    pub name: String,
}

/// Catalog view of a flight. `capacity` is the immutable seat count per cabin;
/// remaining seats live in the inventory ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Flight {
    pub id: Uuid,
    pub flight_number: String,
    pub airline: Airline,
    pub departure_airport: Airport,
    pub arrival_airport: Airport,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub capacity: PerCabin<u32>,
    pub prices: PerCabin<f64>,
    pub status: FlightStatus,
}

impl Flight {
    pub fn route_label(&self) -> String {
        format!("{} to {}", self.departure_airport.code, self.arrival_airport.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cabin_class_parsing() {
        assert_eq!("economy".parse::<CabinClass>().unwrap(), CabinClass::Economy);
        assert_eq!("PREMIUM_ECONOMY".parse::<CabinClass>().unwrap(), CabinClass::PremiumEconomy);
        assert_eq!("premium economy".parse::<CabinClass>().unwrap(), CabinClass::PremiumEconomy);
        assert_eq!("First".parse::<CabinClass>().unwrap(), CabinClass::First);
        assert!(matches!("galley".parse::<CabinClass>(), Err(CoreError::InvalidInput(_))));
    }

    #[test]
    fn test_unknown_cabin_defaults_to_economy() {
        assert_eq!(CabinClass::parse_or_economy(Some("steerage")), CabinClass::Economy);
        assert_eq!(CabinClass::parse_or_economy(None), CabinClass::Economy);
        assert_eq!(CabinClass::parse_or_economy(Some("BUSINESS")), CabinClass::Business);
    }

    #[test]
    fn test_airport_matching() {
        let lhr = Airport {
            id: Uuid::new_v4(),
            code: "LHR".to_string(),
            name: "London Heathrow Airport".to_string(),
            city: "London".to_string(),
            country: "United Kingdom".to_string(),
        };
        assert!(lhr.matches("lhr"));
        assert!(lhr.matches("heathrow"));
        assert!(lhr.matches("LONDON"));
        assert!(!lhr.matches("Paris"));
        assert!(!lhr.matches("   "));
    }

    #[test]
    fn test_per_cabin_lookup() {
        let mut seats = PerCabin { economy: 150, premium_economy: 40, business: 20, first: 8 };
        assert_eq!(seats.get(CabinClass::Business), 20);
        *seats.get_mut(CabinClass::First) -= 1;
        assert_eq!(seats.first, 7);
    }
}
