use async_trait::async_trait;
use skyway_core::flight::{Airline, Airport, Flight};
use skyway_core::repository::FlightCatalog;
use skyway_core::search::RouteQuery;
use skyway_core::{CoreError, CoreResult};
use std::sync::RwLock;
use uuid::Uuid;

/// In-memory flight catalog (development and tests)
pub struct InMemoryFlightCatalog {
    airports: Vec<Airport>,
    airlines: Vec<Airline>,
    flights: RwLock<Vec<Flight>>,
}

impl InMemoryFlightCatalog {
    pub fn new(airports: Vec<Airport>, airlines: Vec<Airline>) -> Self {
        Self {
            airports,
            airlines,
            flights: RwLock::new(Vec::new()),
        }
    }

    pub fn add_flight(&self, flight: Flight) -> CoreResult<()> {
        self.flights
            .write()
            .map_err(|_| CoreError::Storage("catalog lock poisoned".to_string()))?
            .push(flight);
        Ok(())
    }

    pub fn airport(&self, code: &str) -> Option<&Airport> {
        self.airports.iter().find(|a| a.code.eq_ignore_ascii_case(code))
    }

    pub fn airline(&self, code: &str) -> Option<&Airline> {
        self.airlines.iter().find(|a| a.code.eq_ignore_ascii_case(code))
    }

    fn read(&self) -> CoreResult<std::sync::RwLockReadGuard<'_, Vec<Flight>>> {
        self.flights
            .read()
            .map_err(|_| CoreError::Storage("catalog lock poisoned".to_string()))
    }
}

#[async_trait]
impl FlightCatalog for InMemoryFlightCatalog {
    async fn get_flight(&self, id: Uuid) -> CoreResult<Flight> {
        self.read()?
            .iter()
            .find(|f| f.id == id)
            .cloned()
            .ok_or_else(|| CoreError::flight_not_found(id))
    }

    async fn search_by_route(&self, query: &RouteQuery) -> CoreResult<Vec<Flight>> {
        let mut matches: Vec<Flight> = self
            .read()?
            .iter()
            .filter(|f| f.departure_airport.matches(&query.origin))
            .filter(|f| f.arrival_airport.matches(&query.destination))
            .filter(|f| f.departure_time >= query.departs_from)
            .filter(|f| query.departs_before.map_or(true, |end| f.departure_time < end))
            .cloned()
            .collect();

        matches.sort_by_key(|f| f.departure_time);
        if let Some(limit) = query.limit {
            matches.truncate(limit);
        }
        Ok(matches)
    }

    async fn list_airports(&self) -> CoreResult<Vec<Airport>> {
        let mut airports = self.airports.clone();
        airports.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(airports)
    }

    async fn list_airlines(&self) -> CoreResult<Vec<Airline>> {
        let mut airlines = self.airlines.clone();
        airlines.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(airlines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::{self, FlightBuilder};
    use chrono::{Duration, TimeZone, Utc};

    fn catalog() -> InMemoryFlightCatalog {
        InMemoryFlightCatalog::new(seed::airports(), seed::airlines())
    }

    #[tokio::test]
    async fn test_route_search_matches_code_name_or_city() {
        let catalog = catalog();
        let ba = catalog.airline("BA").unwrap().clone();
        let jfk = catalog.airport("JFK").unwrap().clone();
        let lhr = catalog.airport("LHR").unwrap().clone();
        let departure = Utc.with_ymd_and_hms(2030, 5, 1, 9, 0, 0).unwrap();
        let flight = FlightBuilder::new(&ba, &jfk, &lhr, departure).build();
        catalog.add_flight(flight.clone()).unwrap();

        for (origin, destination) in [("JFK", "LHR"), ("new york", "heathrow"), ("Kennedy", "london")] {
            let found = catalog
                .search_by_route(&RouteQuery {
                    origin: origin.to_string(),
                    destination: destination.to_string(),
                    departs_from: departure - Duration::hours(1),
                    departs_before: Some(departure + Duration::hours(1)),
                    limit: None,
                })
                .await
                .unwrap();
            assert_eq!(found.len(), 1, "{origin} -> {destination}");
            assert_eq!(found[0].id, flight.id);
        }

        // Direction matters
        let reverse = catalog
            .search_by_route(&RouteQuery {
                origin: "LHR".to_string(),
                destination: "JFK".to_string(),
                departs_from: departure - Duration::days(1),
                departs_before: None,
                limit: None,
            })
            .await
            .unwrap();
        assert!(reverse.is_empty());
    }

    #[tokio::test]
    async fn test_route_search_orders_and_limits() {
        let catalog = catalog();
        let ba = catalog.airline("BA").unwrap().clone();
        let jfk = catalog.airport("JFK").unwrap().clone();
        let lhr = catalog.airport("LHR").unwrap().clone();
        let base = Utc.with_ymd_and_hms(2030, 5, 1, 9, 0, 0).unwrap();

        for day in [3, 1, 2] {
            catalog
                .add_flight(FlightBuilder::new(&ba, &jfk, &lhr, base + Duration::days(day)).build())
                .unwrap();
        }

        let found = catalog
            .search_by_route(&RouteQuery {
                origin: "JFK".to_string(),
                destination: "LHR".to_string(),
                departs_from: base,
                departs_before: None,
                limit: Some(2),
            })
            .await
            .unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].departure_time, base + Duration::days(1));
        assert_eq!(found[1].departure_time, base + Duration::days(2));
    }

    #[tokio::test]
    async fn test_get_flight_not_found() {
        let catalog = catalog();
        assert!(matches!(
            catalog.get_flight(Uuid::new_v4()).await,
            Err(CoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_reference_data_sorted_by_name() {
        let catalog = catalog();
        let airports = catalog.list_airports().await.unwrap();
        assert!(airports.windows(2).all(|w| w[0].name <= w[1].name));
        let airlines = catalog.list_airlines().await.unwrap();
        assert_eq!(airlines[0].name, "British Airways");
    }
}
