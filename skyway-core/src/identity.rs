use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The caller every core operation acts on behalf of. Trusted as-is; used only for ownership checks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub auth_id: String,
    pub email: String,
}

impl AuthenticatedUser {
    pub fn owns(&self, owner_id: Uuid) -> bool {
        self.user_id == owner_id
    }
}
