use async_trait::async_trait;
use uuid::Uuid;

use crate::account::{IdentityClaims, PaymentMethod, PaymentMethodPatch, ProfileUpdate, User};
use crate::booking::{Booking, BookingStatus, Passenger};
use crate::flight::{Airline, Airport, CabinClass, Flight};
use crate::search::RouteQuery;
use crate::CoreResult;

/// Read-only flight, airport and airline lookup.
#[async_trait]
pub trait FlightCatalog: Send + Sync {
    /// Fails with `NotFound` for unknown ids.
    async fn get_flight(&self, id: Uuid) -> CoreResult<Flight>;

    /// Flights whose departure airport matches `origin` and arrival airport matches
    /// `destination`, inside the departure window, ordered by departure time.
    async fn search_by_route(&self, query: &RouteQuery) -> CoreResult<Vec<Flight>>;

    async fn list_airports(&self) -> CoreResult<Vec<Airport>>;

    async fn list_airlines(&self) -> CoreResult<Vec<Airline>>;
}

/// Remaining seats per flight and cabin class.
///
/// Both adjustments are single atomic conditional updates in the backing store;
/// implementations must never read-then-write from application code.
#[async_trait]
pub trait InventoryLedger: Send + Sync {
    /// Take `count` seats. Fails with `NotFound` for unknown flights and with
    /// `InsufficientInventory` (leaving the counter untouched) when fewer remain.
    /// Returns the seats left afterwards.
    async fn decrement(&self, flight_id: Uuid, cabin: CabinClass, count: u32) -> CoreResult<u32>;

    /// Give `count` seats back. Returns the seats left afterwards.
    async fn increment(&self, flight_id: Uuid, cabin: CabinClass, count: u32) -> CoreResult<u32>;

    /// Current remaining seats; `0` for unknown flights.
    async fn available_seats(&self, flight_id: Uuid, cabin: CabinClass) -> CoreResult<u32>;
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Persist the booking with all segments and passengers, all rows or none.
    async fn insert(&self, booking: &Booking) -> CoreResult<()>;

    async fn get(&self, id: Uuid) -> CoreResult<Option<Booking>>;

    /// Newest first.
    async fn list_for_user(&self, user_id: Uuid) -> CoreResult<Vec<Booking>>;

    /// Overwrite the mutable passenger fields of the given passengers in one transaction.
    /// Fails with `InvalidState` once the booking is CANCELLED or COMPLETED, checked at write time.
    async fn update_passengers(&self, booking_id: Uuid, passengers: &[Passenger]) -> CoreResult<()>;

    async fn set_ticket_url(&self, segment_id: Uuid, ticket_url: Option<&str>) -> CoreResult<()>;

    /// Compare-and-set on the status column. Returns `false` when the booking is no longer in `from`.
    async fn transition_status(&self, id: Uuid, from: BookingStatus, to: BookingStatus) -> CoreResult<bool>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get(&self, id: Uuid) -> CoreResult<Option<User>>;

    async fn find_by_auth_id(&self, auth_id: &str) -> CoreResult<Option<User>>;

    /// Find-or-create keyed on the external auth id, refreshing email and any supplied names.
    async fn upsert_identity(&self, claims: &IdentityClaims) -> CoreResult<User>;

    async fn update_profile(&self, user_id: Uuid, update: &ProfileUpdate) -> CoreResult<User>;
}

/// Payment method storage. Every write touching `is_default` runs in one transaction so
/// a user never ends up with two defaults.
#[async_trait]
pub trait PaymentMethodRepository: Send + Sync {
    async fn list(&self, user_id: Uuid) -> CoreResult<Vec<PaymentMethod>>;

    async fn get(&self, user_id: Uuid, id: Uuid) -> CoreResult<Option<PaymentMethod>>;

    /// Inserts; when the new method is default, clears the flag on the others.
    async fn create(&self, method: &PaymentMethod) -> CoreResult<()>;

    async fn update(&self, user_id: Uuid, id: Uuid, patch: &PaymentMethodPatch) -> CoreResult<Option<PaymentMethod>>;

    /// Deletes; when the removed method was default, promotes the oldest remaining one.
    async fn delete(&self, user_id: Uuid, id: Uuid) -> CoreResult<bool>;

    async fn set_default(&self, user_id: Uuid, id: Uuid) -> CoreResult<Option<PaymentMethod>>;
}
