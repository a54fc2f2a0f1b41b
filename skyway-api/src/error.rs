use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use skyway_core::CoreError;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    ValidationError(String),
    NotFoundError(String),
    ConflictError(String),
    UpstreamError(String),
    InternalServerError(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::AuthenticationError(_) => StatusCode::UNAUTHORIZED,
            AppError::AuthorizationError(_) => StatusCode::FORBIDDEN,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFoundError(_) => StatusCode::NOT_FOUND,
            AppError::ConflictError(_) => StatusCode::CONFLICT,
            AppError::UpstreamError(_) => StatusCode::BAD_GATEWAY,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match self {
            AppError::UpstreamError(msg) => {
                tracing::error!("Upstream failure: {}", msg);
                msg
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                "Internal Server Error".to_string()
            }
            AppError::AuthenticationError(msg)
            | AppError::AuthorizationError(msg)
            | AppError::ValidationError(msg)
            | AppError::NotFoundError(msg)
            | AppError::ConflictError(msg) => msg,
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::NotFound(_) => AppError::NotFoundError(message),
            CoreError::Forbidden(_) => AppError::AuthorizationError(message),
            CoreError::InvalidState(_) | CoreError::InsufficientInventory { .. } => AppError::ConflictError(message),
            CoreError::InvalidInput(_) => AppError::ValidationError(message),
            CoreError::Upstream(_) => AppError::UpstreamError(message),
            CoreError::Storage(_) => AppError::InternalServerError(message),
        }
    }
}
