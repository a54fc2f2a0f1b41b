use skyway_core::account::{IdentityClaims, ProfileUpdate, User};
use skyway_core::repository::UserRepository;
use skyway_core::{CoreError, CoreResult};
use std::sync::Arc;
use tracing::debug;

/// User records keyed by the identity provider's subject.
pub struct ProfileService {
    users: Arc<dyn UserRepository>,
}

impl ProfileService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// Find-or-create the user behind a verified token.
    pub async fn sync_identity(&self, claims: &IdentityClaims) -> CoreResult<User> {
        if claims.auth_id.trim().is_empty() {
            return Err(CoreError::InvalidInput("Identity has no subject".to_string()));
        }
        let user = self.users.upsert_identity(claims).await?;
        debug!(user_id = %user.id, auth_id = %user.auth_id, "Identity synced");
        Ok(user)
    }

    pub async fn get_profile(&self, auth_id: &str) -> CoreResult<User> {
        self.users
            .find_by_auth_id(auth_id)
            .await?
            .ok_or_else(|| CoreError::NotFound("User not found".to_string()))
    }

    /// Only supplied fields change, and a supplied field must not be blank.
    pub async fn update_profile(&self, auth_id: &str, update: ProfileUpdate) -> CoreResult<User> {
        let user = self.get_profile(auth_id).await?;

        let update = ProfileUpdate {
            first_name: non_blank(update.first_name, "firstName")?,
            last_name: non_blank(update.last_name, "lastName")?,
            phone: non_blank(update.phone, "phone")?,
        };
        self.users.update_profile(user.id, &update).await
    }
}

fn non_blank(value: Option<String>, field: &str) -> CoreResult<Option<String>> {
    match value {
        Some(v) if v.trim().is_empty() => Err(CoreError::InvalidInput(format!("{} must not be blank", field))),
        Some(v) => Ok(Some(v.trim().to_string())),
        None => Ok(None),
    }
}
