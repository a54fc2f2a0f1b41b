pub mod availability;
pub mod catalog;
pub mod inventory;
pub mod search;
pub mod seed;

pub use availability::BroadcastingLedger;
pub use catalog::InMemoryFlightCatalog;
pub use inventory::{InMemoryInventoryLedger, InventoryError};
pub use search::{FlightSearchService, SearchRules};
