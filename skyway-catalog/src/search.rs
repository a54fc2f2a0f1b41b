use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Deserialize;
use skyway_core::flight::{CabinClass, Flight};
use skyway_core::repository::{FlightCatalog, InventoryLedger};
use skyway_core::search::{FlightOption, FlightSearchRequest, FlightSearchResult, RouteQuery, TripType};
use skyway_core::{CoreError, CoreResult};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Deserialize)]
pub struct SearchRules {
    /// One-way fallback: how many upcoming flights to consider.
    #[serde(default = "default_fallback_limit")]
    pub fallback_limit: usize,
    #[serde(default = "default_outbound_limit")]
    pub round_trip_outbound_limit: usize,
    #[serde(default = "default_returns_per_outbound")]
    pub returns_per_outbound: usize,
}

fn default_fallback_limit() -> usize { 10 }
fn default_outbound_limit() -> usize { 5 }
fn default_returns_per_outbound() -> usize { 2 }

impl Default for SearchRules {
    fn default() -> Self {
        Self {
            fallback_limit: default_fallback_limit(),
            round_trip_outbound_limit: default_outbound_limit(),
            returns_per_outbound: default_returns_per_outbound(),
        }
    }
}

/// Flight search with capacity filtering.
///
/// Exact-date matches come first; when the requested day has nothing bookable the search
/// falls back to the nearest upcoming flights on the route.
pub struct FlightSearchService {
    catalog: Arc<dyn FlightCatalog>,
    ledger: Arc<dyn InventoryLedger>,
    rules: SearchRules,
}

impl FlightSearchService {
    pub fn new(catalog: Arc<dyn FlightCatalog>, ledger: Arc<dyn InventoryLedger>, rules: SearchRules) -> Self {
        Self { catalog, ledger, rules }
    }

    pub async fn search(&self, request: &FlightSearchRequest) -> CoreResult<FlightSearchResult> {
        self.search_at(request, Utc::now()).await
    }

    /// Same as [`search`](Self::search) with an explicit "now" for the future-flight fallback.
    pub async fn search_at(&self, request: &FlightSearchRequest, now: DateTime<Utc>) -> CoreResult<FlightSearchResult> {
        let cabin = CabinClass::parse_or_economy(request.cabin_class.as_deref());
        let seats = request.passengers.seats_required();

        info!(
            from = %request.from,
            to = %request.to,
            date = %request.departure_date,
            %cabin,
            seats,
            "Searching flights"
        );

        match request.trip_type {
            TripType::OneWay => self.one_way(request, cabin, seats, now).await,
            TripType::RoundTrip => {
                let return_date = request.return_date.ok_or_else(|| {
                    CoreError::InvalidInput("Round trip search requires a return date".to_string())
                })?;
                self.round_trip(request, return_date, cabin, seats, now).await
            }
        }
    }

    async fn one_way(
        &self,
        request: &FlightSearchRequest,
        cabin: CabinClass,
        seats: u32,
        now: DateTime<Utc>,
    ) -> CoreResult<FlightSearchResult> {
        let exact = self
            .catalog
            .search_by_route(&day_query(&request.from, &request.to, request.departure_date))
            .await?;
        let outbound = self.bookable(exact, cabin, seats).await?;

        if !outbound.is_empty() {
            return Ok(FlightSearchResult { outbound_flights: outbound, return_flights: Vec::new() });
        }

        debug!("No exact-date one-way matches, falling back to upcoming flights");
        let upcoming = self
            .catalog
            .search_by_route(&future_query(&request.from, &request.to, now, self.rules.fallback_limit))
            .await?;

        Ok(FlightSearchResult {
            outbound_flights: self.bookable(upcoming, cabin, seats).await?,
            return_flights: Vec::new(),
        })
    }

    async fn round_trip(
        &self,
        request: &FlightSearchRequest,
        return_date: NaiveDate,
        cabin: CabinClass,
        seats: u32,
        now: DateTime<Utc>,
    ) -> CoreResult<FlightSearchResult> {
        let outbound = self
            .catalog
            .search_by_route(&day_query(&request.from, &request.to, request.departure_date))
            .await?;
        let outbound = self.bookable(outbound, cabin, seats).await?;

        let inbound = self
            .catalog
            .search_by_route(&day_query(&request.to, &request.from, return_date))
            .await?;
        let inbound = self.bookable(inbound, cabin, seats).await?;

        if !outbound.is_empty() && !inbound.is_empty() {
            return Ok(FlightSearchResult { outbound_flights: outbound, return_flights: inbound });
        }

        debug!("No exact-date round trip, pairing upcoming flights");
        let upcoming = self
            .catalog
            .search_by_route(&future_query(&request.from, &request.to, now, self.rules.round_trip_outbound_limit))
            .await?;
        let outbound = self.bookable(upcoming, cabin, seats).await?;

        let mut seen = HashSet::new();
        let mut returns = Vec::new();
        for option in &outbound {
            let candidates = self
                .catalog
                .search_by_route(&RouteQuery {
                    origin: request.to.clone(),
                    destination: request.from.clone(),
                    departs_from: option.flight.arrival_time,
                    departs_before: None,
                    limit: Some(self.rules.returns_per_outbound),
                })
                .await?;

            for candidate in self.bookable(candidates, cabin, seats).await? {
                if seen.insert(candidate.flight.id) {
                    returns.push(candidate);
                }
            }
        }

        Ok(FlightSearchResult { outbound_flights: outbound, return_flights: returns })
    }

    /// Keeps the flights that can still seat `seats` passengers in `cabin`.
    async fn bookable(&self, flights: Vec<Flight>, cabin: CabinClass, seats: u32) -> CoreResult<Vec<FlightOption>> {
        let mut options = Vec::with_capacity(flights.len());
        for flight in flights {
            let remaining = self.ledger.available_seats(flight.id, cabin).await?;
            if remaining >= seats {
                let price = flight.prices.get(cabin);
                options.push(FlightOption { flight, remaining_seats: remaining, price });
            }
        }
        Ok(options)
    }
}

fn day_query(origin: &str, destination: &str, date: NaiveDate) -> RouteQuery {
    let start = date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
    RouteQuery {
        origin: origin.to_string(),
        destination: destination.to_string(),
        departs_from: start,
        departs_before: Some(start + Duration::days(1)),
        limit: None,
    }
}

fn future_query(origin: &str, destination: &str, now: DateTime<Utc>, limit: usize) -> RouteQuery {
    RouteQuery {
        origin: origin.to_string(),
        destination: destination.to_string(),
        departs_from: now,
        departs_before: None,
        limit: Some(limit),
    }
}
