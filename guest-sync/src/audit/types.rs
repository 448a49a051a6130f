//! Audit entry types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Audited guest operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    GuestCreated,
    GuestUpdated,
    GuestDeleted,
    GuestMarkedPresent,
    GuestMarkedAbsent,
    GuestsImported,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuditAction::GuestCreated => "guest_created",
            AuditAction::GuestUpdated => "guest_updated",
            AuditAction::GuestDeleted => "guest_deleted",
            AuditAction::GuestMarkedPresent => "guest_marked_present",
            AuditAction::GuestMarkedAbsent => "guest_marked_absent",
            AuditAction::GuestsImported => "guests_imported",
        };
        write!(f, "{s}")
    }
}

/// Entry sent to the audit worker
#[derive(Debug, Clone, PartialEq)]
pub struct AuditLogRequest {
    pub action: AuditAction,
    /// Target guest; `None` for batch operations
    pub guest_id: Option<String>,
    pub actor_id: String,
    pub before: Option<serde_json::Value>,
    pub after: Option<serde_json::Value>,
    pub details: serde_json::Value,
}

impl AuditLogRequest {
    pub fn new(action: AuditAction, actor_id: impl Into<String>) -> Self {
        Self {
            action,
            guest_id: None,
            actor_id: actor_id.into(),
            before: None,
            after: None,
            details: serde_json::Value::Null,
        }
    }

    pub fn guest(mut self, guest_id: impl Into<String>) -> Self {
        self.guest_id = Some(guest_id.into());
        self
    }

    pub fn before(mut self, state: Option<serde_json::Value>) -> Self {
        self.before = state;
        self
    }

    pub fn after(mut self, state: Option<serde_json::Value>) -> Self {
        self.after = state;
        self
    }

    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}
