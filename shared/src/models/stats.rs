//! Guest statistics (derived, never persisted)

use super::guest::Guest;
use serde::{Deserialize, Serialize};

/// Aggregate counts over a guest list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestStats {
    pub total: u32,
    pub present: u32,
    pub absent: u32,
    pub total_companions: u32,
    pub present_companions: u32,
}

impl GuestStats {
    pub fn from_guests(guests: &[Guest]) -> Self {
        guests.iter().fold(Self::default(), |mut stats, guest| {
            let companions = u32::from(guest.companions);
            stats.total += 1;
            stats.total_companions += companions;
            if guest.is_present {
                stats.present += 1;
                stats.present_companions += companions;
            } else {
                stats.absent += 1;
            }
            stats
        })
    }
}
