use async_trait::async_trait;
use chrono::{DateTime, Utc};
use skyway_core::flight::{Airline, Airport, Flight, PerCabin};
use skyway_core::repository::FlightCatalog;
use skyway_core::search::RouteQuery;
use skyway_core::{CoreError, CoreResult};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::{column, db_error, to_u32};

pub struct PostgresFlightCatalog {
    pub pool: PgPool,
}

impl PostgresFlightCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Capacity is pivoted out of flight_inventory; airports and airlines are joined in.
const FLIGHT_SELECT: &str = r#"
    SELECT
        f.id, f.flight_number, f.departure_time, f.arrival_time, f.status,
        f.economy_price, f.premium_economy_price, f.business_price, f.first_class_price,
        al.id AS airline_id, al.code AS airline_code, al.name AS airline_name,
        da.id AS dep_id, da.code AS dep_code, da.name AS dep_name, da.city AS dep_city, da.country AS dep_country,
        aa.id AS arr_id, aa.code AS arr_code, aa.name AS arr_name, aa.city AS arr_city, aa.country AS arr_country,
        COALESCE(MAX(i.total_seats) FILTER (WHERE i.cabin_class = 'ECONOMY'), 0) AS economy_seats,
        COALESCE(MAX(i.total_seats) FILTER (WHERE i.cabin_class = 'PREMIUM_ECONOMY'), 0) AS premium_economy_seats,
        COALESCE(MAX(i.total_seats) FILTER (WHERE i.cabin_class = 'BUSINESS'), 0) AS business_seats,
        COALESCE(MAX(i.total_seats) FILTER (WHERE i.cabin_class = 'FIRST'), 0) AS first_seats
    FROM flights f
    JOIN airlines al ON al.id = f.airline_id
    JOIN airports da ON da.id = f.departure_airport_id
    JOIN airports aa ON aa.id = f.arrival_airport_id
    LEFT JOIN flight_inventory i ON i.flight_id = f.id
"#;

const FLIGHT_GROUP: &str = "GROUP BY f.id, al.id, da.id, aa.id";

#[derive(sqlx::FromRow)]
struct FlightRow {
    id: Uuid,
    flight_number: String,
    departure_time: DateTime<Utc>,
    arrival_time: DateTime<Utc>,
    status: String,
    economy_price: f64,
    premium_economy_price: f64,
    business_price: f64,
    first_class_price: f64,
    airline_id: Uuid,
    airline_code: String,
    airline_name: String,
    dep_id: Uuid,
    dep_code: String,
    dep_name: String,
    dep_city: String,
    dep_country: String,
    arr_id: Uuid,
    arr_code: String,
    arr_name: String,
    arr_city: String,
    arr_country: String,
    economy_seats: i32,
    premium_economy_seats: i32,
    business_seats: i32,
    first_seats: i32,
}

impl TryFrom<FlightRow> for Flight {
    type Error = CoreError;

    fn try_from(row: FlightRow) -> Result<Self, Self::Error> {
        Ok(Flight {
            id: row.id,
            flight_number: row.flight_number,
            airline: Airline { id: row.airline_id, code: row.airline_code, name: row.airline_name },
            departure_airport: Airport {
                id: row.dep_id,
                code: row.dep_code,
                name: row.dep_name,
                city: row.dep_city,
                country: row.dep_country,
            },
            arrival_airport: Airport {
                id: row.arr_id,
                code: row.arr_code,
                name: row.arr_name,
                city: row.arr_city,
                country: row.arr_country,
            },
            departure_time: row.departure_time,
            arrival_time: row.arrival_time,
            capacity: PerCabin {
                economy: to_u32(row.economy_seats, "capacity")?,
                premium_economy: to_u32(row.premium_economy_seats, "capacity")?,
                business: to_u32(row.business_seats, "capacity")?,
                first: to_u32(row.first_seats, "capacity")?,
            },
            prices: PerCabin {
                economy: row.economy_price,
                premium_economy: row.premium_economy_price,
                business: row.business_price,
                first: row.first_class_price,
            },
            status: column(&row.status)?,
        })
    }
}

/// `%needle%` for ILIKE with the pattern metacharacters escaped.
fn contains_pattern(needle: &str) -> String {
    let escaped = needle
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait]
impl FlightCatalog for PostgresFlightCatalog {
    async fn get_flight(&self, id: Uuid) -> CoreResult<Flight> {
        let sql = format!("{} WHERE f.id = $1 {}", FLIGHT_SELECT, FLIGHT_GROUP);
        let row: Option<FlightRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        row.ok_or_else(|| CoreError::flight_not_found(id))?.try_into()
    }

    async fn search_by_route(&self, query: &RouteQuery) -> CoreResult<Vec<Flight>> {
        if query.origin.trim().is_empty() || query.destination.trim().is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            r#"{}
            WHERE (da.code ILIKE $1 OR da.name ILIKE $1 OR da.city ILIKE $1)
              AND (aa.code ILIKE $2 OR aa.name ILIKE $2 OR aa.city ILIKE $2)
              AND f.departure_time >= $3
              AND ($4::timestamptz IS NULL OR f.departure_time < $4)
            {}
            ORDER BY f.departure_time
            LIMIT $5"#,
            FLIGHT_SELECT, FLIGHT_GROUP
        );

        let rows: Vec<FlightRow> = sqlx::query_as(&sql)
            .bind(contains_pattern(&query.origin))
            .bind(contains_pattern(&query.destination))
            .bind(query.departs_from)
            .bind(query.departs_before)
            .bind(query.limit.map(|l| l as i64))
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        rows.into_iter().map(Flight::try_from).collect()
    }

    async fn list_airports(&self) -> CoreResult<Vec<Airport>> {
        let rows: Vec<(Uuid, String, String, String, String)> =
            sqlx::query_as("SELECT id, code, name, city, country FROM airports ORDER BY name")
                .fetch_all(&self.pool)
                .await
                .map_err(db_error)?;

        Ok(rows
            .into_iter()
            .map(|(id, code, name, city, country)| Airport { id, code, name, city, country })
            .collect())
    }

    async fn list_airlines(&self) -> CoreResult<Vec<Airline>> {
        let rows: Vec<(Uuid, String, String)> = sqlx::query_as("SELECT id, code, name FROM airlines ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(rows.into_iter().map(|(id, code, name)| Airline { id, code, name }).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern(" JFK "), "%JFK%");
        assert_eq!(contains_pattern("100%_"), "%100\\%\\_%");
    }
}
