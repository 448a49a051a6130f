//! UpdateGuest applier

use super::ActionApplier;
use shared::models::{ActionPayload, Guest, PendingAction};

/// UpdateGuest applier
pub struct GuestUpdatedApplier;

impl ActionApplier for GuestUpdatedApplier {
    fn apply(&self, guests: &mut Vec<Guest>, action: &PendingAction) {
        if let ActionPayload::UpdateGuest { id, changes } = &action.payload {
            if let Some(guest) = guests.iter_mut().find(|g| g.id == *id) {
                guest.apply_update(changes, action.timestamp);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{GuestCreate, GuestUpdate};

    fn update(id: &str, changes: GuestUpdate) -> PendingAction {
        PendingAction {
            id: "a-1".to_string(),
            payload: ActionPayload::UpdateGuest {
                id: id.to_string(),
                changes,
            },
            timestamp: 5_000,
            retry_count: 0,
        }
    }

    #[test]
    fn test_merges_provided_fields() {
        let mut guests = vec![Guest::from_create(
            "g-1",
            &GuestCreate::new("Jean Dupont", "Table 1", 2),
            1_000,
            None,
        )];
        let action = update(
            "g-1",
            GuestUpdate {
                companions: Some(4),
                ..Default::default()
            },
        );
        GuestUpdatedApplier.apply(&mut guests, &action);

        assert_eq!(guests[0].companions, 4);
        assert_eq!(guests[0].table_name, "Table 1");
        assert_eq!(guests[0].updated_at, 5_000);
    }

    #[test]
    fn test_missing_guest_is_noop() {
        let mut guests = vec![Guest::from_create(
            "g-1",
            &GuestCreate::new("Jean Dupont", "Table 1", 2),
            1_000,
            None,
        )];
        let before = guests.clone();
        let action = update(
            "g-404",
            GuestUpdate {
                companions: Some(4),
                ..Default::default()
            },
        );
        GuestUpdatedApplier.apply(&mut guests, &action);
        assert_eq!(guests, before);
    }
}
