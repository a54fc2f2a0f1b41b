use axum::{
    extract::{Extension, Json, Path, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use skyway_core::booking::{BookingOutcome, CreateBookingRequest, UpdateBookingRequest};
use skyway_core::identity::AuthenticatedUser;
use skyway_core::itinerary::BookingDetails;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking).get(list_bookings))
        .route("/v1/bookings/{id}", get(get_booking).put(update_booking))
        .route("/v1/bookings/{id}/cancel", post(cancel_booking))
}

async fn create_booking(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingOutcome>), AppError> {
    let outcome = state.bookings.create(&caller, req).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

async fn list_bookings(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<BookingDetails>>, AppError> {
    Ok(Json(state.bookings.list(&caller).await?))
}

async fn get_booking(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingDetails>, AppError> {
    Ok(Json(state.bookings.get(&caller, id).await?))
}

async fn update_booking(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateBookingRequest>,
) -> Result<Json<BookingOutcome>, AppError> {
    Ok(Json(state.bookings.update(&caller, id, req).await?))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingOutcome>, AppError> {
    Ok(Json(state.bookings.cancel(&caller, id).await?))
}
