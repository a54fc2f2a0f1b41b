use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use tracing::warn;

use crate::state::AppState;

/// Per-IP fixed window. Passes everything through when no limiter is configured or Redis fails.
pub async fn rate_limit_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(limiter) = &state.rate_limiter else {
        return next.run(req).await;
    };
    let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>().copied() else {
        return next.run(req).await;
    };

    let key = format!("ratelimit:{}", addr.ip());
    match limiter
        .redis
        .check_rate_limit(&key, limiter.config.requests_per_window, limiter.config.window_seconds)
        .await
    {
        Ok(true) => next.run(req).await,
        Ok(false) => (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded").into_response(),
        Err(e) => {
            warn!(error = %e, "Rate limiter unavailable, failing open");
            next.run(req).await
        }
    }
}
