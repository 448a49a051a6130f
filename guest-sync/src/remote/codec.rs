//! Guest <-> document field mapping
//!
//! Field names match the camelCase serde names of [`Guest`]. Every write
//! stamps `updatedAt` with the server clock and `updatedBy` with the actor.

use serde_json::Value;
use shared::models::{Guest, GuestCreate, GuestUpdate};

use super::{RemoteDocument, RemoteError, WriteFields, WriteValue};

fn stamp(fields: &mut WriteFields, actor_id: &str) {
    fields.insert("updatedAt".to_string(), WriteValue::ServerTimestamp);
    fields.insert("updatedBy".to_string(), WriteValue::value(actor_id));
}

/// New guest document, not present, server-stamped creation time
pub fn encode_create(data: &GuestCreate, actor_id: &str) -> WriteFields {
    let mut fields = WriteFields::new();
    fields.insert(
        "fullName".to_string(),
        WriteValue::value(data.full_name.as_str()),
    );
    fields.insert(
        "tableName".to_string(),
        WriteValue::value(data.table_name.as_str()),
    );
    fields.insert("companions".to_string(), WriteValue::value(data.companions));
    fields.insert("isPresent".to_string(), WriteValue::value(false));
    fields.insert("createdAt".to_string(), WriteValue::ServerTimestamp);
    stamp(&mut fields, actor_id);
    fields
}

/// Partial update: only provided fields are written
pub fn encode_update(changes: &GuestUpdate, actor_id: &str) -> WriteFields {
    let mut fields = WriteFields::new();
    if let Some(full_name) = &changes.full_name {
        fields.insert(
            "fullName".to_string(),
            WriteValue::value(full_name.as_str()),
        );
    }
    if let Some(table_name) = &changes.table_name {
        fields.insert(
            "tableName".to_string(),
            WriteValue::value(table_name.as_str()),
        );
    }
    if let Some(companions) = changes.companions {
        fields.insert("companions".to_string(), WriteValue::value(companions));
    }
    if let Some(is_present) = changes.is_present {
        fields.insert("isPresent".to_string(), WriteValue::value(is_present));
    }
    stamp(&mut fields, actor_id);
    fields
}

pub fn encode_presence(is_present: bool, actor_id: &str) -> WriteFields {
    let mut fields = WriteFields::new();
    fields.insert("isPresent".to_string(), WriteValue::value(is_present));
    stamp(&mut fields, actor_id);
    fields
}

/// Decode a stored document; the document id wins over any `id` field
pub fn decode_guest(doc: &RemoteDocument) -> Result<Guest, RemoteError> {
    let mut fields = doc.fields.clone();
    fields.insert("id".to_string(), Value::String(doc.id.clone()));
    serde_json::from_value(Value::Object(fields)).map_err(|e| RemoteError::Malformed {
        id: doc.id.clone(),
        reason: e.to_string(),
    })
}
