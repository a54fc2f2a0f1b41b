use axum::{
    extract::{Extension, Json, Path, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use skyway_core::account::{NewPaymentMethod, PaymentMethod, PaymentMethodPatch, ProfileUpdate, User};
use skyway_core::identity::AuthenticatedUser;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/users/me", get(get_profile).put(update_profile))
        .route("/v1/users/me/payment-methods", get(list_payment_methods).post(create_payment_method))
        .route(
            "/v1/users/me/payment-methods/{id}",
            get(get_payment_method).put(update_payment_method).delete(delete_payment_method),
        )
        .route("/v1/users/me/payment-methods/{id}/default", post(set_default_payment_method))
}

async fn get_profile(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> Result<Json<User>, AppError> {
    Ok(Json(state.profiles.get_profile(&caller.auth_id).await?))
}

async fn update_profile(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<User>, AppError> {
    Ok(Json(state.profiles.update_profile(&caller.auth_id, update).await?))
}

async fn list_payment_methods(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<PaymentMethod>>, AppError> {
    Ok(Json(state.wallet.list(caller.user_id).await?))
}

async fn get_payment_method(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<PaymentMethod>, AppError> {
    Ok(Json(state.wallet.get(caller.user_id, id).await?))
}

async fn create_payment_method(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Json(new): Json<NewPaymentMethod>,
) -> Result<(StatusCode, Json<PaymentMethod>), AppError> {
    let method = state.wallet.create(caller.user_id, new).await?;
    Ok((StatusCode::CREATED, Json(method)))
}

async fn update_payment_method(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    Json(patch): Json<PaymentMethodPatch>,
) -> Result<Json<PaymentMethod>, AppError> {
    Ok(Json(state.wallet.update(caller.user_id, id, patch).await?))
}

async fn delete_payment_method(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.wallet.delete(caller.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_default_payment_method(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<PaymentMethod>, AppError> {
    Ok(Json(state.wallet.set_default(caller.user_id, id).await?))
}
