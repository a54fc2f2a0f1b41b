use chrono::{Datelike, Utc};
use skyway_core::account::{NewPaymentMethod, PaymentMethod, PaymentMethodPatch};
use skyway_core::repository::PaymentMethodRepository;
use skyway_core::{CoreError, CoreResult};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Stored card references. Only the last four digits survive; the CVV is dropped on arrival.
pub struct WalletService {
    methods: Arc<dyn PaymentMethodRepository>,
}

impl WalletService {
    pub fn new(methods: Arc<dyn PaymentMethodRepository>) -> Self {
        Self { methods }
    }

    pub async fn list(&self, user_id: Uuid) -> CoreResult<Vec<PaymentMethod>> {
        self.methods.list(user_id).await
    }

    pub async fn get(&self, user_id: Uuid, id: Uuid) -> CoreResult<PaymentMethod> {
        self.methods.get(user_id, id).await?.ok_or_else(not_found)
    }

    pub async fn create(&self, user_id: Uuid, new: NewPaymentMethod) -> CoreResult<PaymentMethod> {
        let card_number: String = new
            .card_number
            .expose()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect();
        if !(12..=19).contains(&card_number.len()) || !card_number.chars().all(|c| c.is_ascii_digit()) {
            return Err(CoreError::InvalidInput("Card number must be 12 to 19 digits".to_string()));
        }
        if new.card_holder_name.expose().trim().is_empty() {
            return Err(CoreError::InvalidInput("Card holder name is required".to_string()));
        }
        if new.card_type.trim().is_empty() {
            return Err(CoreError::InvalidInput("Card type is required".to_string()));
        }

        let now = Utc::now();
        let method = PaymentMethod {
            id: Uuid::new_v4(),
            user_id,
            card_holder_name: new.card_holder_name.expose().trim().to_string().into(),
            card_type: new.card_type.trim().to_string(),
            last_four_digits: card_number[card_number.len() - 4..].to_string(),
            expiry_month: parse_month(&new.expiry_month)?,
            expiry_year: parse_year(&new.expiry_year, now.year() as u32)?,
            is_default: new.is_default,
            created_at: now,
            updated_at: now,
        };

        self.methods.create(&method).await?;
        info!(%user_id, payment_method_id = %method.id, is_default = method.is_default, "Payment method added");
        Ok(method)
    }

    pub async fn update(&self, user_id: Uuid, id: Uuid, patch: PaymentMethodPatch) -> CoreResult<PaymentMethod> {
        if patch
            .card_holder_name
            .as_ref()
            .is_some_and(|name| name.expose().trim().is_empty())
        {
            return Err(CoreError::InvalidInput("Card holder name must not be blank".to_string()));
        }
        self.methods.update(user_id, id, &patch).await?.ok_or_else(not_found)
    }

    /// Removing the default promotes the oldest remaining method.
    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> CoreResult<()> {
        if !self.methods.delete(user_id, id).await? {
            return Err(not_found());
        }
        info!(%user_id, payment_method_id = %id, "Payment method removed");
        Ok(())
    }

    pub async fn set_default(&self, user_id: Uuid, id: Uuid) -> CoreResult<PaymentMethod> {
        self.methods.set_default(user_id, id).await?.ok_or_else(not_found)
    }
}

fn not_found() -> CoreError {
    CoreError::NotFound("Payment method not found".to_string())
}

fn parse_month(raw: &str) -> CoreResult<u32> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|m| (1..=12).contains(m))
        .ok_or_else(|| CoreError::InvalidInput(format!("Invalid expiry month: {}", raw)))
}

/// Accepts `YY` or `YYYY`; two-digit years are taken in the current century.
fn parse_year(raw: &str, current_year: u32) -> CoreResult<u32> {
    let raw = raw.trim();
    let invalid = || CoreError::InvalidInput(format!("Invalid expiry year: {}", raw));
    let year = raw.parse::<u32>().map_err(|_| invalid())?;
    match raw.len() {
        2 => Ok(current_year - current_year % 100 + year),
        4 => Ok(year),
        _ => Err(invalid()),
    }
}
