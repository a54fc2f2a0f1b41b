//! Process-local repositories for development and tests.

use async_trait::async_trait;
use chrono::Utc;
use skyway_core::account::{IdentityClaims, PaymentMethod, PaymentMethodPatch, ProfileUpdate, User};
use skyway_core::booking::{Booking, BookingStatus, Passenger};
use skyway_core::repository::{BookingRepository, PaymentMethodRepository, UserRepository};
use skyway_core::{CoreError, CoreResult};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

fn poisoned() -> CoreError {
    CoreError::Storage("repository lock poisoned".to_string())
}

fn read<T>(lock: &RwLock<T>) -> CoreResult<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| poisoned())
}

fn write<T>(lock: &RwLock<T>) -> CoreResult<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| poisoned())
}

#[derive(Default)]
pub struct InMemoryBookingRepository {
    bookings: RwLock<HashMap<Uuid, Booking>>,
}

impl InMemoryBookingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bookings.read().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn insert(&self, booking: &Booking) -> CoreResult<()> {
        let mut bookings = write(&self.bookings)?;
        if bookings.contains_key(&booking.id) {
            return Err(CoreError::Storage(format!("Booking {} already exists", booking.id)));
        }
        bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> CoreResult<Option<Booking>> {
        Ok(read(&self.bookings)?.get(&id).cloned())
    }

    async fn list_for_user(&self, user_id: Uuid) -> CoreResult<Vec<Booking>> {
        let mut bookings: Vec<Booking> = read(&self.bookings)?
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn update_passengers(&self, booking_id: Uuid, passengers: &[Passenger]) -> CoreResult<()> {
        let mut bookings = write(&self.bookings)?;
        let booking = bookings
            .get_mut(&booking_id)
            .ok_or_else(|| CoreError::booking_not_found(booking_id))?;
        if booking.status.is_terminal() {
            return Err(CoreError::InvalidState(format!(
                "Booking {} is {}",
                booking_id,
                booking.status.as_str()
            )));
        }

        for updated in passengers {
            if let Some(passenger) = booking.passengers.iter_mut().find(|p| p.id == updated.id) {
                passenger.first_name = updated.first_name.clone();
                passenger.last_name = updated.last_name.clone();
                passenger.nationality = updated.nationality.clone();
                passenger.passenger_type = updated.passenger_type;
            }
        }
        booking.updated_at = Utc::now();
        Ok(())
    }

    async fn set_ticket_url(&self, segment_id: Uuid, ticket_url: Option<&str>) -> CoreResult<()> {
        let mut bookings = write(&self.bookings)?;
        let segment = bookings
            .values_mut()
            .flat_map(|b| b.segments.iter_mut())
            .find(|s| s.id == segment_id)
            .ok_or_else(|| CoreError::NotFound(format!("Flight segment with ID {} not found", segment_id)))?;
        segment.ticket_url = ticket_url.map(str::to_string);
        Ok(())
    }

    async fn transition_status(&self, id: Uuid, from: BookingStatus, to: BookingStatus) -> CoreResult<bool> {
        let mut bookings = write(&self.bookings)?;
        match bookings.get_mut(&id) {
            Some(booking) if booking.status == from => {
                booking.status = to;
                booking.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn get(&self, id: Uuid) -> CoreResult<Option<User>> {
        Ok(read(&self.users)?.get(&id).cloned())
    }

    async fn find_by_auth_id(&self, auth_id: &str) -> CoreResult<Option<User>> {
        Ok(read(&self.users)?.values().find(|u| u.auth_id == auth_id).cloned())
    }

    async fn upsert_identity(&self, claims: &IdentityClaims) -> CoreResult<User> {
        let mut users = write(&self.users)?;
        let now = Utc::now();

        if let Some(user) = users.values_mut().find(|u| u.auth_id == claims.auth_id) {
            user.email = claims.email.clone();
            if claims.first_name.is_some() {
                user.first_name = claims.first_name.clone();
            }
            if claims.last_name.is_some() {
                user.last_name = claims.last_name.clone();
            }
            user.updated_at = now;
            return Ok(user.clone());
        }

        let user = User {
            id: Uuid::new_v4(),
            auth_id: claims.auth_id.clone(),
            email: claims.email.clone(),
            first_name: claims.first_name.clone(),
            last_name: claims.last_name.clone(),
            phone: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_profile(&self, user_id: Uuid, update: &ProfileUpdate) -> CoreResult<User> {
        let mut users = write(&self.users)?;
        let user = users
            .get_mut(&user_id)
            .ok_or_else(|| CoreError::NotFound("User not found".to_string()))?;

        if let Some(first_name) = &update.first_name {
            user.first_name = Some(first_name.clone());
        }
        if let Some(last_name) = &update.last_name {
            user.last_name = Some(last_name.clone());
        }
        if let Some(phone) = &update.phone {
            user.phone = Some(phone.clone());
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }
}

/// Every mutation happens under one write lock, so default-flag maintenance is atomic.
#[derive(Default)]
pub struct InMemoryPaymentMethodRepository {
    methods: RwLock<Vec<PaymentMethod>>,
}

impl InMemoryPaymentMethodRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn clear_defaults(methods: &mut [PaymentMethod], user_id: Uuid, except: Uuid) {
    for method in methods.iter_mut().filter(|m| m.user_id == user_id && m.id != except) {
        method.is_default = false;
    }
}

#[async_trait]
impl PaymentMethodRepository for InMemoryPaymentMethodRepository {
    async fn list(&self, user_id: Uuid) -> CoreResult<Vec<PaymentMethod>> {
        let mut methods: Vec<PaymentMethod> = read(&self.methods)?
            .iter()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect();
        methods.sort_by_key(|m| m.created_at);
        Ok(methods)
    }

    async fn get(&self, user_id: Uuid, id: Uuid) -> CoreResult<Option<PaymentMethod>> {
        Ok(read(&self.methods)?
            .iter()
            .find(|m| m.id == id && m.user_id == user_id)
            .cloned())
    }

    async fn create(&self, method: &PaymentMethod) -> CoreResult<()> {
        let mut methods = write(&self.methods)?;
        if method.is_default {
            clear_defaults(&mut methods, method.user_id, method.id);
        }
        methods.push(method.clone());
        Ok(())
    }

    async fn update(&self, user_id: Uuid, id: Uuid, patch: &PaymentMethodPatch) -> CoreResult<Option<PaymentMethod>> {
        let mut methods = write(&self.methods)?;
        if !methods.iter().any(|m| m.id == id && m.user_id == user_id) {
            return Ok(None);
        }
        if patch.is_default == Some(true) {
            clear_defaults(&mut methods, user_id, id);
        }

        let method = methods
            .iter_mut()
            .find(|m| m.id == id && m.user_id == user_id)
            .ok_or_else(poisoned)?;
        if let Some(holder) = &patch.card_holder_name {
            method.card_holder_name = holder.clone();
        }
        if let Some(is_default) = patch.is_default {
            method.is_default = is_default;
        }
        method.updated_at = Utc::now();
        Ok(Some(method.clone()))
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> CoreResult<bool> {
        let mut methods = write(&self.methods)?;
        let Some(index) = methods.iter().position(|m| m.id == id && m.user_id == user_id) else {
            return Ok(false);
        };

        let removed = methods.remove(index);
        if removed.is_default {
            if let Some(next) = methods
                .iter_mut()
                .filter(|m| m.user_id == user_id)
                .min_by_key(|m| m.created_at)
            {
                next.is_default = true;
                next.updated_at = Utc::now();
            }
        }
        Ok(true)
    }

    async fn set_default(&self, user_id: Uuid, id: Uuid) -> CoreResult<Option<PaymentMethod>> {
        let patch = PaymentMethodPatch { card_holder_name: None, is_default: Some(true) };
        self.update(user_id, id, &patch).await
    }
}
