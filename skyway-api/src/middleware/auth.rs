use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use skyway_core::account::IdentityClaims;
use skyway_core::identity::AuthenticatedUser;

use crate::error::AppError;
use crate::state::AppState;

/// HS256 token issued by the identity provider.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct IdentityTokenClaims {
    pub sub: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    pub exp: usize,
}

impl From<IdentityTokenClaims> for IdentityClaims {
    fn from(claims: IdentityTokenClaims) -> Self {
        IdentityClaims {
            auth_id: claims.sub,
            email: claims.email,
            first_name: claims.given_name,
            last_name: claims.family_name,
        }
    }
}

/// Verifies the bearer token, syncs the user record and attaches an [`AuthenticatedUser`].
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::AuthenticationError("Missing bearer token".to_string()))?;

    let token_data = decode::<IdentityTokenClaims>(
        token,
        &DecodingKey::from_secret(state.auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| AppError::AuthenticationError(format!("Invalid token: {}", e)))?;

    let user = state.profiles.sync_identity(&token_data.claims.into()).await?;

    req.extensions_mut().insert(AuthenticatedUser {
        user_id: user.id,
        auth_id: user.auth_id,
        email: user.email,
    });

    Ok(next.run(req).await)
}
