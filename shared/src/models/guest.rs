//! Guest Model

use serde::{Deserialize, Serialize};

/// Wedding guest entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guest {
    /// Remote document id, or the pending action id for optimistic inserts
    pub id: String,
    pub full_name: String,
    pub table_name: String,
    pub companions: u8,
    #[serde(default)]
    pub is_present: bool,
    /// Server-assigned (millis)
    pub created_at: i64,
    /// Server-assigned (millis), never decreases for a given record
    pub updated_at: i64,
    /// Actor id of the last writer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

impl Guest {
    /// Build a not-yet-present guest from a create payload
    pub fn from_create(
        id: impl Into<String>,
        data: &GuestCreate,
        timestamp: i64,
        updated_by: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            full_name: data.full_name.clone(),
            table_name: data.table_name.clone(),
            companions: data.companions,
            is_present: false,
            created_at: timestamp,
            updated_at: timestamp,
            updated_by,
        }
    }

    /// Shallow-merge the provided fields and bump `updated_at`
    pub fn apply_update(&mut self, changes: &GuestUpdate, timestamp: i64) {
        if let Some(full_name) = &changes.full_name {
            self.full_name = full_name.clone();
        }
        if let Some(table_name) = &changes.table_name {
            self.table_name = table_name.clone();
        }
        if let Some(companions) = changes.companions {
            self.companions = companions;
        }
        if let Some(is_present) = changes.is_present {
            self.is_present = is_present;
        }
        self.touch(timestamp);
    }

    /// Set presence and bump `updated_at`
    pub fn set_present(&mut self, is_present: bool, timestamp: i64) {
        self.is_present = is_present;
        self.touch(timestamp);
    }

    /// Party size at the venue: the guest plus companions
    pub fn party_size(&self) -> u32 {
        1 + u32::from(self.companions)
    }

    fn touch(&mut self, timestamp: i64) {
        self.updated_at = self.updated_at.max(timestamp);
    }
}

/// Create guest payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestCreate {
    pub full_name: String,
    pub table_name: String,
    #[serde(default)]
    pub companions: u8,
}

impl GuestCreate {
    pub fn new(full_name: impl Into<String>, table_name: impl Into<String>, companions: u8) -> Self {
        Self {
            full_name: full_name.into(),
            table_name: table_name.into(),
            companions,
        }
    }
}

/// Update guest payload (only provided fields change)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub companions: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_present: Option<bool>,
}

impl GuestUpdate {
    /// True when no field would change
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.table_name.is_none()
            && self.companions.is_none()
            && self.is_present.is_none()
    }
}
