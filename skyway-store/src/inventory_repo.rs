use async_trait::async_trait;
use skyway_core::flight::{CabinClass, PerCabin};
use skyway_core::repository::InventoryLedger;
use skyway_core::{CoreError, CoreResult};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::database::{db_error, to_u32};

/// Seat ledger over `flight_inventory`. Every adjustment is one conditional UPDATE, so
/// concurrent requests on the same flight and cabin serialize on the row lock and the
/// `total_seats - sold_seats >= n` guard can never be raced.
pub struct PostgresInventoryLedger {
    pub pool: PgPool,
}

impl PostgresInventoryLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the per-cabin rows for a newly scheduled flight. Existing rows are left as they are.
    pub async fn register(&self, flight_id: Uuid, capacity: PerCabin<u32>) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        for cabin in CabinClass::ALL {
            sqlx::query(
                r#"
                INSERT INTO flight_inventory (flight_id, cabin_class, total_seats, sold_seats)
                VALUES ($1, $2, $3, 0)
                ON CONFLICT (flight_id, cabin_class) DO NOTHING
                "#,
            )
            .bind(flight_id)
            .bind(cabin.as_str())
            .bind(capacity.get(cabin) as i32)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }
        tx.commit().await.map_err(db_error)
    }

    async fn remaining(&self, flight_id: Uuid, cabin: CabinClass) -> CoreResult<Option<(u32, u32)>> {
        let row: Option<(i32, i32)> = sqlx::query_as(
            "SELECT total_seats, sold_seats FROM flight_inventory WHERE flight_id = $1 AND cabin_class = $2",
        )
        .bind(flight_id)
        .bind(cabin.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(|(total, sold)| Ok((to_u32(total, "total_seats")?, to_u32(sold, "sold_seats")?)))
            .transpose()
    }
}

#[async_trait]
impl InventoryLedger for PostgresInventoryLedger {
    async fn decrement(&self, flight_id: Uuid, cabin: CabinClass, count: u32) -> CoreResult<u32> {
        let remaining: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE flight_inventory
            SET sold_seats = sold_seats + $3
            WHERE flight_id = $1 AND cabin_class = $2 AND total_seats - sold_seats >= $3
            RETURNING total_seats - sold_seats
            "#,
        )
        .bind(flight_id)
        .bind(cabin.as_str())
        .bind(count as i32)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        if let Some(remaining) = remaining {
            debug!(%flight_id, %cabin, count, remaining, "Seats reserved");
            return to_u32(remaining, "remaining seats");
        }

        // Nothing updated: tell a missing flight apart from a full cabin.
        match self.remaining(flight_id, cabin).await? {
            None => Err(CoreError::flight_not_found(flight_id)),
            Some((total, sold)) => Err(CoreError::InsufficientInventory {
                flight_id,
                cabin_class: cabin,
                requested: count,
                available: total.saturating_sub(sold),
            }),
        }
    }

    async fn increment(&self, flight_id: Uuid, cabin: CabinClass, count: u32) -> CoreResult<u32> {
        let remaining: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE flight_inventory
            SET sold_seats = sold_seats - $3
            WHERE flight_id = $1 AND cabin_class = $2 AND sold_seats >= $3
            RETURNING total_seats - sold_seats
            "#,
        )
        .bind(flight_id)
        .bind(cabin.as_str())
        .bind(count as i32)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        if let Some(remaining) = remaining {
            debug!(%flight_id, %cabin, count, remaining, "Seats released");
            return to_u32(remaining, "remaining seats");
        }

        match self.remaining(flight_id, cabin).await? {
            None => Err(CoreError::flight_not_found(flight_id)),
            Some((_, sold)) => Err(CoreError::InvalidState(format!(
                "Cannot release {} seats on flight {} ({}): only {} sold",
                count, flight_id, cabin, sold
            ))),
        }
    }

    async fn available_seats(&self, flight_id: Uuid, cabin: CabinClass) -> CoreResult<u32> {
        Ok(self
            .remaining(flight_id, cabin)
            .await?
            .map(|(total, sold)| total.saturating_sub(sold))
            .unwrap_or(0))
    }
}
