use axum::{
    extract::{Json, Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures_util::{Stream, StreamExt};
use skyway_core::flight::{Airline, Airport, Flight};
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/flights/{id}", get(get_flight))
        .route("/v1/flights/{id}/seats/stream", get(seat_updates))
        .route("/v1/airports", get(list_airports))
        .route("/v1/airlines", get(list_airlines))
}

async fn get_flight(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Flight>, AppError> {
    Ok(Json(state.catalog.get_flight(id).await?))
}

async fn list_airports(State(state): State<AppState>) -> Result<Json<Vec<Airport>>, AppError> {
    Ok(Json(state.catalog.list_airports().await?))
}

async fn list_airlines(State(state): State<AppState>) -> Result<Json<Vec<Airline>>, AppError> {
    Ok(Json(state.catalog.list_airlines().await?))
}

/// Server-sent `seat_update` events for one flight. Updates missed by a lagging client are skipped.
async fn seat_updates(
    State(state): State<AppState>,
    Path(flight_id): Path<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(state.seat_updates.subscribe()).filter_map(move |update| async move {
        match update {
            Ok(event) if event.flight_id == flight_id => {
                match Event::default().event("seat_update").json_data(&event) {
                    Ok(sse) => Some(Ok(sse)),
                    Err(e) => {
                        tracing::warn!(%flight_id, error = %e, "Failed to encode seat update");
                        None
                    }
                }
            }
            _ => None,
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
