//! Action applier implementations
//!
//! Each applier handles one action kind. Appliers are pure functions over
//! the projected list.

use enum_dispatch::enum_dispatch;

use shared::models::{ActionPayload, Guest, PendingAction};

mod guest_added;
mod guest_deleted;
mod guest_updated;
mod presence_changed;

pub use guest_added::GuestAddedApplier;
pub use guest_deleted::GuestDeletedApplier;
pub use guest_updated::GuestUpdatedApplier;
pub use presence_changed::PresenceChangedApplier;

/// Applies one pending action to a guest list in place
#[enum_dispatch]
pub trait ActionApplier {
    fn apply(&self, guests: &mut Vec<Guest>, action: &PendingAction);
}

/// Static dispatch over concrete appliers
#[enum_dispatch(ActionApplier)]
pub enum ApplierAction {
    GuestAdded(GuestAddedApplier),
    GuestUpdated(GuestUpdatedApplier),
    GuestDeleted(GuestDeletedApplier),
    PresenceChanged(PresenceChangedApplier),
}

/// The only match on `ActionPayload` in the projector
impl From<&PendingAction> for ApplierAction {
    fn from(action: &PendingAction) -> Self {
        match &action.payload {
            ActionPayload::AddGuest { .. } => ApplierAction::GuestAdded(GuestAddedApplier),
            ActionPayload::UpdateGuest { .. } => ApplierAction::GuestUpdated(GuestUpdatedApplier),
            ActionPayload::DeleteGuest { .. } => ApplierAction::GuestDeleted(GuestDeletedApplier),
            ActionPayload::MarkPresent { .. } => {
                ApplierAction::PresenceChanged(PresenceChangedApplier { present: true })
            }
            ActionPayload::MarkAbsent { .. } => {
                ApplierAction::PresenceChanged(PresenceChangedApplier { present: false })
            }
        }
    }
}
