use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use skyway_core::flight::{CabinClass, Flight, PerCabin};
use skyway_core::repository::InventoryLedger;
use skyway_core::{CoreError, CoreResult};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// Seats for one cabin of one flight. `total_seats` never changes after registration.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CabinSeats {
    pub total_seats: u32,
    pub sold_seats: u32,
}

impl CabinSeats {
    pub fn new(total_seats: u32) -> Self {
        Self { total_seats, sold_seats: 0 }
    }

    pub fn remaining(&self) -> u32 {
        self.total_seats.saturating_sub(self.sold_seats)
    }

    /// Take seats, refusing to go below zero remaining.
    pub fn reserve(&mut self, flight_id: Uuid, cabin: CabinClass, quantity: u32) -> Result<u32, InventoryError> {
        let available = self.remaining();
        if available < quantity {
            return Err(InventoryError::InsufficientInventory {
                flight_id,
                cabin,
                requested: quantity,
                available,
            });
        }
        self.sold_seats += quantity;
        Ok(self.remaining())
    }

    /// Give seats back, refusing to release more than were sold.
    pub fn release(&mut self, flight_id: Uuid, cabin: CabinClass, quantity: u32) -> Result<u32, InventoryError> {
        if self.sold_seats < quantity {
            return Err(InventoryError::OverRelease {
                flight_id,
                cabin,
                requested: quantity,
                sold: self.sold_seats,
            });
        }
        self.sold_seats -= quantity;
        Ok(self.remaining())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("Inventory not found for flight {0}")]
    NotFound(Uuid),

    #[error("Insufficient inventory on flight {flight_id} ({cabin}): requested {requested}, available {available}")]
    InsufficientInventory {
        flight_id: Uuid,
        cabin: CabinClass,
        requested: u32,
        available: u32,
    },

    #[error("Cannot release {requested} seats on flight {flight_id} ({cabin}): only {sold} sold")]
    OverRelease {
        flight_id: Uuid,
        cabin: CabinClass,
        requested: u32,
        sold: u32,
    },

    #[error("Inventory lock poisoned")]
    Poisoned,
}

impl From<InventoryError> for CoreError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::NotFound(flight_id) => CoreError::flight_not_found(flight_id),
            InventoryError::InsufficientInventory { flight_id, cabin, requested, available } => {
                CoreError::InsufficientInventory {
                    flight_id,
                    cabin_class: cabin,
                    requested,
                    available,
                }
            }
            e @ InventoryError::OverRelease { .. } => CoreError::InvalidState(e.to_string()),
            InventoryError::Poisoned => CoreError::Storage("inventory lock poisoned".to_string()),
        }
    }
}

/// Process-local ledger. Each adjustment happens under one lock acquisition, which is the
/// in-memory equivalent of a single conditional UPDATE.
pub struct InMemoryInventoryLedger {
    inventory: Mutex<HashMap<Uuid, PerCabin<CabinSeats>>>,
}

impl InMemoryInventoryLedger {
    pub fn new() -> Self {
        Self {
            inventory: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_flights(flights: &[Flight]) -> Self {
        let ledger = Self::new();
        for flight in flights {
            // A fresh map cannot be poisoned.
            let _ = ledger.register(flight.id, flight.capacity);
        }
        ledger
    }

    /// Register a flight with its full capacity and nothing sold.
    pub fn register(&self, flight_id: Uuid, capacity: PerCabin<u32>) -> Result<(), InventoryError> {
        let seats = PerCabin {
            economy: CabinSeats::new(capacity.economy),
            premium_economy: CabinSeats::new(capacity.premium_economy),
            business: CabinSeats::new(capacity.business),
            first: CabinSeats::new(capacity.first),
        };
        self.inventory
            .lock()
            .map_err(|_| InventoryError::Poisoned)?
            .insert(flight_id, seats);
        Ok(())
    }

    pub fn seats(&self, flight_id: Uuid, cabin: CabinClass) -> Option<CabinSeats> {
        self.inventory
            .lock()
            .ok()?
            .get(&flight_id)
            .map(|seats| seats.get(cabin))
    }

    /// Share of the cabin already sold, 0.0 to 1.0.
    pub fn utilization(&self, flight_id: Uuid, cabin: CabinClass) -> Option<f64> {
        self.seats(flight_id, cabin).map(|seats| {
            if seats.total_seats == 0 {
                0.0
            } else {
                seats.sold_seats as f64 / seats.total_seats as f64
            }
        })
    }

    fn adjust<F>(&self, flight_id: Uuid, cabin: CabinClass, op: F) -> Result<u32, InventoryError>
    where
        F: FnOnce(&mut CabinSeats) -> Result<u32, InventoryError>,
    {
        let mut inventory = self.inventory.lock().map_err(|_| InventoryError::Poisoned)?;
        let seats = inventory
            .get_mut(&flight_id)
            .ok_or(InventoryError::NotFound(flight_id))?;
        op(seats.get_mut(cabin))
    }
}

impl Default for InMemoryInventoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InventoryLedger for InMemoryInventoryLedger {
    async fn decrement(&self, flight_id: Uuid, cabin: CabinClass, count: u32) -> CoreResult<u32> {
        let remaining = self.adjust(flight_id, cabin, |seats| seats.reserve(flight_id, cabin, count))?;
        tracing::debug!(%flight_id, %cabin, count, remaining, "Seats reserved");
        Ok(remaining)
    }

    async fn increment(&self, flight_id: Uuid, cabin: CabinClass, count: u32) -> CoreResult<u32> {
        let remaining = self.adjust(flight_id, cabin, |seats| seats.release(flight_id, cabin, count))?;
        tracing::debug!(%flight_id, %cabin, count, remaining, "Seats released");
        Ok(remaining)
    }

    async fn available_seats(&self, flight_id: Uuid, cabin: CabinClass) -> CoreResult<u32> {
        let inventory = self
            .inventory
            .lock()
            .map_err(|_| CoreError::Storage("inventory lock poisoned".to_string()))?;
        Ok(inventory
            .get(&flight_id)
            .map(|seats| seats.get(cabin).remaining())
            .unwrap_or(0))
    }
}
