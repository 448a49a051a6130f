//! AddGuest applier
//!
//! Appends a synthetic guest whose id is the pending action id, so later
//! queued actions can target it before the remote store assigns a real id.

use super::ActionApplier;
use shared::models::{ActionPayload, Guest, PendingAction};

/// AddGuest applier
pub struct GuestAddedApplier;

impl ActionApplier for GuestAddedApplier {
    fn apply(&self, guests: &mut Vec<Guest>, action: &PendingAction) {
        if let ActionPayload::AddGuest { guest } = &action.payload {
            guests.push(Guest::from_create(
                action.id.clone(),
                guest,
                action.timestamp,
                None,
            ));
        }
    }
}
