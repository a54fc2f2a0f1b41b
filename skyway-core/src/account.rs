use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skyway_shared::Masked;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub auth_id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Greeting name for transactional mail.
    pub fn display_name(&self) -> String {
        let name = format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        );
        let name = name.trim();
        if name.is_empty() {
            "Valued Customer".to_string()
        } else {
            name.to_string()
        }
    }
}

/// Verified claims handed over by the external identity provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdentityClaims {
    pub auth_id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

/// Stored card reference. Only the last four digits are kept; there is no gateway token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethod {
    pub id: Uuid,
    pub user_id: Uuid,
    pub card_holder_name: Masked<String>,
    pub card_type: String,
    pub last_four_digits: String,
    pub expiry_month: u32,
    pub expiry_year: u32,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPaymentMethod {
    pub card_holder_name: Masked<String>,
    pub card_type: String,
    pub card_number: Masked<String>,
    pub expiry_month: String,
    pub expiry_year: String,
    /// Accepted for wire compatibility and dropped immediately.
    pub cvv: Option<Masked<String>>,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodPatch {
    pub card_holder_name: Option<Masked<String>>,
    pub is_default: Option<bool>,
}
