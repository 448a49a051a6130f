//! Optimistic projector
//!
//! Derives the list the UI renders from the last confirmed snapshot plus
//! the pending queue. Pure: no IO, no clock, no shared state.

mod appliers;

pub use appliers::{
    ActionApplier, ApplierAction, GuestAddedApplier, GuestDeletedApplier, GuestUpdatedApplier,
    PresenceChangedApplier,
};

use shared::models::{Guest, PendingAction};

/// Apply pending actions on top of a snapshot, oldest first
///
/// Equal timestamps keep queue order. Actions targeting an unknown id are
/// no-ops.
pub fn project(snapshot: &[Guest], pending: &[PendingAction]) -> Vec<Guest> {
    let mut guests = snapshot.to_vec();

    let mut ordered: Vec<&PendingAction> = pending.iter().collect();
    ordered.sort_by_key(|a| a.timestamp);

    for action in ordered {
        let applier = ApplierAction::from(action);
        applier.apply(&mut guests, action);
    }

    guests
}
