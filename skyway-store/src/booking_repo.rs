use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use skyway_core::booking::{Booking, BookingStatus, FlightSegment, Passenger};
use skyway_core::repository::BookingRepository;
use skyway_core::{CoreError, CoreResult};
use skyway_shared::Masked;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::database::{column, db_error, to_u32};

pub struct PostgresBookingRepository {
    pub pool: PgPool,
}

impl PostgresBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attach segments and passengers to booking rows in two queries.
    async fn assemble(&self, rows: Vec<BookingRow>) -> CoreResult<Vec<Booking>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();

        let segments: Vec<SegmentRow> = sqlx::query_as(
            r#"
            SELECT id, booking_id, flight_id, cabin_class, fare_amount, seats, is_return, ticket_url
            FROM flight_segments
            WHERE booking_id = ANY($1)
            ORDER BY is_return, id
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        let passengers: Vec<PassengerRow> = sqlx::query_as(
            r#"
            SELECT id, booking_id, first_name, last_name, date_of_birth, nationality,
                   passport_number, passport_expiry, passenger_type
            FROM passengers
            WHERE booking_id = ANY($1)
            ORDER BY booking_id, position
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        let mut segments_by_booking: HashMap<Uuid, Vec<FlightSegment>> = HashMap::new();
        for row in segments {
            segments_by_booking.entry(row.booking_id).or_default().push(row.try_into()?);
        }
        let mut passengers_by_booking: HashMap<Uuid, Vec<Passenger>> = HashMap::new();
        for row in passengers {
            passengers_by_booking.entry(row.booking_id).or_default().push(row.try_into()?);
        }

        rows.into_iter()
            .map(|row| {
                let segments = segments_by_booking.remove(&row.id).unwrap_or_default();
                let passengers = passengers_by_booking.remove(&row.id).unwrap_or_default();
                row.into_booking(segments, passengers)
            })
            .collect()
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    user_id: Uuid,
    total_amount: f64,
    status: String,
    payment_status: String,
    payment_method_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BookingRow {
    fn into_booking(self, segments: Vec<FlightSegment>, passengers: Vec<Passenger>) -> CoreResult<Booking> {
        Ok(Booking {
            id: self.id,
            user_id: self.user_id,
            total_amount: self.total_amount,
            status: column(&self.status)?,
            payment_status: column(&self.payment_status)?,
            payment_method_id: self.payment_method_id,
            segments,
            passengers,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SegmentRow {
    id: Uuid,
    booking_id: Uuid,
    flight_id: Uuid,
    cabin_class: String,
    fare_amount: f64,
    seats: i32,
    is_return: bool,
    ticket_url: Option<String>,
}

impl TryFrom<SegmentRow> for FlightSegment {
    type Error = CoreError;

    fn try_from(row: SegmentRow) -> Result<Self, Self::Error> {
        Ok(FlightSegment {
            id: row.id,
            booking_id: row.booking_id,
            flight_id: row.flight_id,
            cabin_class: column(&row.cabin_class)?,
            fare_amount: row.fare_amount,
            seats: to_u32(row.seats, "segment seats")?,
            is_return: row.is_return,
            ticket_url: row.ticket_url,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PassengerRow {
    id: Uuid,
    booking_id: Uuid,
    first_name: String,
    last_name: String,
    date_of_birth: Option<NaiveDate>,
    nationality: Option<String>,
    passport_number: Option<String>,
    passport_expiry: Option<NaiveDate>,
    passenger_type: String,
}

impl TryFrom<PassengerRow> for Passenger {
    type Error = CoreError;

    fn try_from(row: PassengerRow) -> Result<Self, Self::Error> {
        Ok(Passenger {
            id: row.id,
            booking_id: row.booking_id,
            first_name: row.first_name,
            last_name: row.last_name,
            date_of_birth: row.date_of_birth,
            nationality: row.nationality,
            passport_number: row.passport_number.map(Masked),
            passport_expiry: row.passport_expiry,
            passenger_type: column(&row.passenger_type)?,
        })
    }
}

const BOOKING_COLUMNS: &str =
    "id, user_id, total_amount, status, payment_status, payment_method_id, created_at, updated_at";

#[async_trait]
impl BookingRepository for PostgresBookingRepository {
    async fn insert(&self, booking: &Booking) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        sqlx::query(
            r#"
            INSERT INTO bookings (id, user_id, total_amount, status, payment_status, payment_method_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(booking.id)
        .bind(booking.user_id)
        .bind(booking.total_amount)
        .bind(booking.status.as_str())
        .bind(booking.payment_status.as_str())
        .bind(booking.payment_method_id)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        for segment in &booking.segments {
            sqlx::query(
                r#"
                INSERT INTO flight_segments (id, booking_id, flight_id, cabin_class, fare_amount, seats, is_return, ticket_url)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(segment.id)
            .bind(booking.id)
            .bind(segment.flight_id)
            .bind(segment.cabin_class.as_str())
            .bind(segment.fare_amount)
            .bind(segment.seats as i32)
            .bind(segment.is_return)
            .bind(segment.ticket_url.as_deref())
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }

        for (position, passenger) in booking.passengers.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO passengers (id, booking_id, first_name, last_name, date_of_birth, nationality,
                                        passport_number, passport_expiry, passenger_type, position)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(passenger.id)
            .bind(booking.id)
            .bind(&passenger.first_name)
            .bind(&passenger.last_name)
            .bind(passenger.date_of_birth)
            .bind(passenger.nationality.as_deref())
            .bind(passenger.passport_number.as_ref().map(|p| p.expose().as_str()))
            .bind(passenger.passport_expiry)
            .bind(passenger.passenger_type.as_str())
            .bind(position as i32)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }

        // Dropping the transaction on any error above rolls everything back.
        tx.commit().await.map_err(db_error)
    }

    async fn get(&self, id: Uuid) -> CoreResult<Option<Booking>> {
        let sql = format!("SELECT {} FROM bookings WHERE id = $1", BOOKING_COLUMNS);
        let row: Option<BookingRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        match row {
            Some(row) => Ok(self.assemble(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_for_user(&self, user_id: Uuid) -> CoreResult<Vec<Booking>> {
        let sql = format!(
            "SELECT {} FROM bookings WHERE user_id = $1 ORDER BY created_at DESC",
            BOOKING_COLUMNS
        );
        let rows: Vec<BookingRow> = sqlx::query_as(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        self.assemble(rows).await
    }

    async fn update_passengers(&self, booking_id: Uuid, passengers: &[Passenger]) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        // Row lock on a live booking; a concurrent cancel either waits for us or wins first
        let touched = sqlx::query(
            "UPDATE bookings SET updated_at = NOW() WHERE id = $1 AND status NOT IN ('CANCELLED', 'COMPLETED')",
        )
        .bind(booking_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?
        .rows_affected();
        if touched == 0 {
            let status: Option<String> = sqlx::query_scalar("SELECT status FROM bookings WHERE id = $1")
                .bind(booking_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_error)?;
            return Err(match status {
                Some(status) => CoreError::InvalidState(format!("Booking {} is {}", booking_id, status)),
                None => CoreError::booking_not_found(booking_id),
            });
        }

        for passenger in passengers {
            sqlx::query(
                r#"
                UPDATE passengers
                SET first_name = $3, last_name = $4, nationality = $5, passenger_type = $6
                WHERE id = $1 AND booking_id = $2
                "#,
            )
            .bind(passenger.id)
            .bind(booking_id)
            .bind(&passenger.first_name)
            .bind(&passenger.last_name)
            .bind(passenger.nationality.as_deref())
            .bind(passenger.passenger_type.as_str())
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)
    }

    async fn set_ticket_url(&self, segment_id: Uuid, ticket_url: Option<&str>) -> CoreResult<()> {
        let updated = sqlx::query("UPDATE flight_segments SET ticket_url = $2 WHERE id = $1")
            .bind(segment_id)
            .bind(ticket_url)
            .execute(&self.pool)
            .await
            .map_err(db_error)?
            .rows_affected();

        if updated == 0 {
            return Err(CoreError::NotFound(format!("Flight segment with ID {} not found", segment_id)));
        }
        Ok(())
    }

    async fn transition_status(&self, id: Uuid, from: BookingStatus, to: BookingStatus) -> CoreResult<bool> {
        let updated = sqlx::query(
            "UPDATE bookings SET status = $3, updated_at = NOW() WHERE id = $1 AND status = $2",
        )
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_error)?
        .rows_affected();

        Ok(updated == 1)
    }
}
