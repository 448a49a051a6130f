//! Pending Action Model
//!
//! A mutation issued while offline (or whose remote write failed) waiting to
//! be replayed against the remote store.

use super::guest::{GuestCreate, GuestUpdate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Action type discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    AddGuest,
    UpdateGuest,
    DeleteGuest,
    MarkPresent,
    MarkAbsent,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionType::AddGuest => write!(f, "ADD_GUEST"),
            ActionType::UpdateGuest => write!(f, "UPDATE_GUEST"),
            ActionType::DeleteGuest => write!(f, "DELETE_GUEST"),
            ActionType::MarkPresent => write!(f, "MARK_PRESENT"),
            ActionType::MarkAbsent => write!(f, "MARK_ABSENT"),
        }
    }
}

/// Replay payload, tagged by action type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum ActionPayload {
    AddGuest {
        guest: GuestCreate,
    },
    UpdateGuest {
        id: String,
        changes: GuestUpdate,
    },
    DeleteGuest {
        guest_id: String,
    },
    MarkPresent {
        guest_id: String,
    },
    MarkAbsent {
        guest_id: String,
    },
}

impl ActionPayload {
    pub fn action_type(&self) -> ActionType {
        match self {
            ActionPayload::AddGuest { .. } => ActionType::AddGuest,
            ActionPayload::UpdateGuest { .. } => ActionType::UpdateGuest,
            ActionPayload::DeleteGuest { .. } => ActionType::DeleteGuest,
            ActionPayload::MarkPresent { .. } => ActionType::MarkPresent,
            ActionPayload::MarkAbsent { .. } => ActionType::MarkAbsent,
        }
    }

    /// The existing guest this action targets (`None` for inserts)
    pub fn target_guest_id(&self) -> Option<&str> {
        match self {
            ActionPayload::AddGuest { .. } => None,
            ActionPayload::UpdateGuest { id, .. } => Some(id),
            ActionPayload::DeleteGuest { guest_id }
            | ActionPayload::MarkPresent { guest_id }
            | ActionPayload::MarkAbsent { guest_id } => Some(guest_id),
        }
    }

    /// Point the action at `to` if it currently targets `from`
    ///
    /// Returns whether the payload changed.
    pub fn retarget(&mut self, from: &str, to: &str) -> bool {
        let target = match self {
            ActionPayload::AddGuest { .. } => return false,
            ActionPayload::UpdateGuest { id, .. } => id,
            ActionPayload::DeleteGuest { guest_id }
            | ActionPayload::MarkPresent { guest_id }
            | ActionPayload::MarkAbsent { guest_id } => guest_id,
        };
        if target != from {
            return false;
        }
        *target = to.to_string();
        true
    }
}

/// Queued mutation intent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingAction {
    /// Locally generated, time-ordered id (also the temporary guest id for inserts)
    pub id: String,
    pub payload: ActionPayload,
    /// Creation time (millis), drives merge and replay order
    pub timestamp: i64,
    /// Failed replay attempts so far
    #[serde(default)]
    pub retry_count: u32,
}

impl PendingAction {
    /// Create a new action with a fresh time-ordered id
    pub fn new(payload: ActionPayload) -> Self {
        let raw_id = crate::util::snowflake_id();
        Self {
            id: raw_id.to_string(),
            payload,
            timestamp: crate::util::snowflake_millis(raw_id),
            retry_count: 0,
        }
    }

    pub fn action_type(&self) -> ActionType {
        self.payload.action_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_wire_format() {
        let payload = ActionPayload::MarkPresent {
            guest_id: "g-1".to_string(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "MARK_PRESENT");
        assert_eq!(json["guestId"], "g-1");
    }

    #[test]
    fn test_pending_action_deserialize() {
        let json = r#"{
            "id": "42",
            "payload": {
                "type": "UPDATE_GUEST",
                "id": "g-9",
                "changes": { "tableName": "Table 3" }
            },
            "timestamp": 1700000000000
        }"#;
        let action: PendingAction = serde_json::from_str(json).unwrap();
        assert_eq!(action.retry_count, 0);
        assert_eq!(action.action_type(), ActionType::UpdateGuest);
        assert_eq!(action.payload.target_guest_id(), Some("g-9"));
    }

    #[test]
    fn test_new_action_timestamp_matches_id() {
        let action = PendingAction::new(ActionPayload::AddGuest {
            guest: GuestCreate::new("Jean Dupont", "Table 1", 2),
        });
        let raw: i64 = action.id.parse().unwrap();
        assert_eq!(crate::util::snowflake_millis(raw), action.timestamp);
        assert_eq!(action.retry_count, 0);
    }

    #[test]
    fn test_retarget() {
        let mut payload = ActionPayload::DeleteGuest {
            guest_id: "tmp-1".to_string(),
        };
        assert!(!payload.retarget("other", "real-1"));
        assert!(payload.retarget("tmp-1", "real-1"));
        assert_eq!(payload.target_guest_id(), Some("real-1"));

        let mut add = ActionPayload::AddGuest {
            guest: GuestCreate::new("Jean Dupont", "Table 1", 2),
        };
        assert!(!add.retarget("tmp-1", "real-1"));
    }

    #[test]
    fn test_action_type_display() {
        assert_eq!(ActionType::AddGuest.to_string(), "ADD_GUEST");
        assert_eq!(ActionType::MarkAbsent.to_string(), "MARK_ABSENT");
    }
}
