use skyway_core::booking::{Booking, ChangeSet, Passenger, PassengerChange, PassengerUpdate};
use skyway_core::{CoreError, CoreResult};
use tracing::warn;
use uuid::Uuid;

/// Passenger edits resolved against a booking: the rows to write and the old/new diff to report.
#[derive(Debug, Clone, Default)]
pub struct PassengerChanges {
    pub updated: Vec<Passenger>,
    pub change_set: ChangeSet,
}

impl PassengerChanges {
    /// Resolve `updates` against the booking's passengers.
    ///
    /// Unknown passenger ids are skipped, and edits that leave every field as it was do not
    /// count as changes. A repeated id is applied in order and reported once against the
    /// original values.
    pub fn compute(booking: &Booking, updates: &[PassengerUpdate]) -> CoreResult<Self> {
        let mut working = booking.passengers.clone();
        let mut touched: Vec<Uuid> = Vec::new();

        for update in updates {
            let first_name = update.first_name.trim();
            let last_name = update.last_name.trim();
            if first_name.is_empty() || last_name.is_empty() {
                return Err(CoreError::InvalidInput(format!(
                    "Passenger {} needs a first and last name",
                    update.id
                )));
            }

            let Some(passenger) = working.iter_mut().find(|p| p.id == update.id) else {
                warn!(booking_id = %booking.id, passenger_id = %update.id, "Skipping update for unknown passenger");
                continue;
            };

            passenger.first_name = first_name.to_string();
            passenger.last_name = last_name.to_string();
            passenger.nationality = update.nationality.clone();
            if let Some(passenger_type) = update.passenger_type {
                passenger.passenger_type = passenger_type;
            }

            if !touched.contains(&update.id) {
                touched.push(update.id);
            }
        }

        let mut changes = PassengerChanges::default();
        for id in touched {
            let (Some(before), Some(after)) = (
                booking.passengers.iter().find(|p| p.id == id),
                working.iter().find(|p| p.id == id),
            ) else {
                continue;
            };

            let old_data = before.fields();
            let new_data = after.fields();
            if old_data == new_data {
                continue;
            }

            changes.updated.push(after.clone());
            changes.change_set.passengers.push(PassengerChange { id, old_data, new_data });
        }

        Ok(changes)
    }

    pub fn is_empty(&self) -> bool {
        self.change_set.is_empty()
    }

    /// Write the updated passengers into `booking`.
    pub fn apply(&self, booking: &mut Booking) {
        for updated in &self.updated {
            if let Some(passenger) = booking.passengers.iter_mut().find(|p| p.id == updated.id) {
                *passenger = updated.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::booking_with_passengers;
    use skyway_core::booking::PassengerType;

    fn update(id: Uuid, first: &str, last: &str) -> PassengerUpdate {
        PassengerUpdate {
            id,
            first_name: first.to_string(),
            last_name: last.to_string(),
            nationality: None,
            passenger_type: None,
        }
    }

    #[test]
    fn test_diff_reports_old_and_new_values() {
        let booking = booking_with_passengers(&[PassengerType::Adult, PassengerType::Child]);
        let child = booking.passengers[1].id;

        let mut edit = update(child, "Grace", "Hopper");
        edit.nationality = Some("US".to_string());
        let changes = PassengerChanges::compute(&booking, &[edit]).unwrap();

        assert_eq!(changes.updated.len(), 1);
        let change = &changes.change_set.passengers[0];
        assert_eq!(change.id, child);
        assert_eq!(change.old_data.first_name, booking.passengers[1].first_name);
        assert_eq!(change.new_data.first_name, "Grace");
        assert_eq!(change.new_data.nationality.as_deref(), Some("US"));
        // Type not supplied, so it is kept
        assert_eq!(change.new_data.passenger_type, PassengerType::Child);
    }

    #[test]
    fn test_unknown_and_unchanged_passengers_are_skipped() {
        let booking = booking_with_passengers(&[PassengerType::Adult]);
        let existing = &booking.passengers[0];

        let same = PassengerUpdate {
            id: existing.id,
            first_name: existing.first_name.clone(),
            last_name: existing.last_name.clone(),
            nationality: existing.nationality.clone(),
            passenger_type: Some(existing.passenger_type),
        };
        let unknown = update(Uuid::new_v4(), "Nobody", "Here");

        let changes = PassengerChanges::compute(&booking, &[same, unknown]).unwrap();
        assert!(changes.is_empty());
        assert!(changes.updated.is_empty());
    }

    #[test]
    fn test_blank_names_are_rejected() {
        let booking = booking_with_passengers(&[PassengerType::Adult]);
        let result = PassengerChanges::compute(&booking, &[update(booking.passengers[0].id, "  ", "Smith")]);
        assert!(matches!(result, Err(CoreError::InvalidInput(_))));
    }

    #[test]
    fn test_apply_rewrites_booking_passengers() {
        let mut booking = booking_with_passengers(&[PassengerType::Adult, PassengerType::Adult]);
        let id = booking.passengers[0].id;
        let changes = PassengerChanges::compute(&booking, &[update(id, "Alan", "Turing")]).unwrap();

        changes.apply(&mut booking);
        assert_eq!(booking.passengers[0].full_name(), "Alan Turing");
        assert_ne!(booking.passengers[1].full_name(), "Alan Turing");
    }
}
