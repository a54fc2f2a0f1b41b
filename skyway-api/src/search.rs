use axum::{
    extract::{Json, State},
    routing::post,
    Router,
};
use skyway_core::search::{FlightSearchRequest, FlightSearchResult};
use tracing::info;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/flights/search", post(search_flights))
}

async fn search_flights(
    State(state): State<AppState>,
    Json(req): Json<FlightSearchRequest>,
) -> Result<Json<FlightSearchResult>, AppError> {
    let result = state.search.search(&req).await?;
    info!(
        from = %req.from,
        to = %req.to,
        outbound = result.outbound_flights.len(),
        returns = result.return_flights.len(),
        "Flight search served"
    );
    Ok(Json(result))
}
