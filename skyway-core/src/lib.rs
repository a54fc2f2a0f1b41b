pub mod account;
pub mod booking;
pub mod events;
pub mod flight;
pub mod identity;
pub mod itinerary;
pub mod notification;
pub mod repository;
pub mod search;
pub mod ticketing;

use uuid::Uuid;

pub use flight::CabinClass;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Insufficient inventory on flight {flight_id} ({cabin_class}): requested {requested}, available {available}")]
    InsufficientInventory {
        flight_id: Uuid,
        cabin_class: CabinClass,
        requested: u32,
        available: u32,
    },
    #[error("Upstream service failed: {0}")]
    Upstream(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

impl CoreError {
    pub fn flight_not_found(flight_id: Uuid) -> Self {
        CoreError::NotFound(format!("Flight with ID {} not found", flight_id))
    }

    pub fn booking_not_found(booking_id: Uuid) -> Self {
        CoreError::NotFound(format!("Booking with ID {} not found", booking_id))
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
