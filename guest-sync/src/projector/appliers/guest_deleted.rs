//! DeleteGuest applier

use super::ActionApplier;
use shared::models::{ActionPayload, Guest, PendingAction};

/// DeleteGuest applier
pub struct GuestDeletedApplier;

impl ActionApplier for GuestDeletedApplier {
    fn apply(&self, guests: &mut Vec<Guest>, action: &PendingAction) {
        if let ActionPayload::DeleteGuest { guest_id } = &action.payload {
            guests.retain(|g| g.id != *guest_id);
        }
    }
}
