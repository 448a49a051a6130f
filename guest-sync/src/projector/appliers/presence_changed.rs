//! MarkPresent / MarkAbsent applier

use super::ActionApplier;
use shared::models::{ActionPayload, Guest, PendingAction};

/// Presence applier, `present` selects the target state
pub struct PresenceChangedApplier {
    pub present: bool,
}

impl ActionApplier for PresenceChangedApplier {
    fn apply(&self, guests: &mut Vec<Guest>, action: &PendingAction) {
        let guest_id = match &action.payload {
            ActionPayload::MarkPresent { guest_id } | ActionPayload::MarkAbsent { guest_id } => {
                guest_id
            }
            _ => return,
        };

        if let Some(guest) = guests.iter_mut().find(|g| g.id == *guest_id) {
            guest.set_present(self.present, action.timestamp);
        }
    }
}
