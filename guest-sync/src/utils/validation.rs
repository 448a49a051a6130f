//! Input validation helpers
//!
//! Every write path (facade, synchronizer, batch import) validates and
//! sanitizes through these functions before touching the queue or the
//! remote store. Lengths are counted in characters after trimming.

use shared::error::ErrorCode;
use shared::models::{GuestCreate, GuestUpdate};

use crate::error::{SyncError, SyncResult};

// ── Field limits ────────────────────────────────────────────────────

pub const MIN_NAME_LEN: usize = 2;
pub const MAX_NAME_LEN: usize = 100;

pub const MIN_TABLE_LEN: usize = 1;
pub const MAX_TABLE_LEN: usize = 50;

pub const MAX_COMPANIONS: u8 = 10;

/// Document ids are opaque, but must be usable as a path segment
pub const MAX_ID_LEN: usize = 128;

/// Bounds of a required text field and the code reported when violated
#[derive(Debug, Clone, Copy)]
pub struct TextRule {
    pub field: &'static str,
    pub min_len: usize,
    pub max_len: usize,
    pub code: ErrorCode,
}

pub const FULL_NAME: TextRule = TextRule {
    field: "fullName",
    min_len: MIN_NAME_LEN,
    max_len: MAX_NAME_LEN,
    code: ErrorCode::GuestNameInvalid,
};

pub const TABLE_NAME: TextRule = TextRule {
    field: "tableName",
    min_len: MIN_TABLE_LEN,
    max_len: MAX_TABLE_LEN,
    code: ErrorCode::TableNameInvalid,
};

// ── Field validators ────────────────────────────────────────────────

/// Trim and bound a required text field
pub fn sanitize_text(value: &str, rule: &TextRule) -> SyncResult<String> {
    let TextRule {
        field,
        min_len,
        max_len,
        code,
    } = *rule;
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if len == 0 {
        return Err(SyncError::invalid(code, format!("{field} must not be empty")));
    }
    if len < min_len {
        return Err(SyncError::invalid(
            code,
            format!("{field} is too short ({len} chars, min {min_len})"),
        ));
    }
    if len > max_len {
        return Err(SyncError::invalid(
            code,
            format!("{field} is too long ({len} chars, max {max_len})"),
        ));
    }
    Ok(trimmed.to_string())
}

pub fn validate_companions(companions: u8) -> SyncResult<u8> {
    if companions > MAX_COMPANIONS {
        return Err(SyncError::invalid(
            ErrorCode::CompanionsOutOfRange,
            format!("companions must be between 0 and {MAX_COMPANIONS} (got {companions})"),
        ));
    }
    Ok(companions)
}

/// Validate a guest id argument (format only, existence is the store's concern)
pub fn validate_guest_id(id: &str) -> SyncResult<()> {
    if id.trim().is_empty() {
        return Err(SyncError::validation("guest id must not be empty"));
    }
    if id.len() > MAX_ID_LEN {
        return Err(SyncError::validation(format!(
            "guest id is too long ({} bytes, max {MAX_ID_LEN})",
            id.len()
        )));
    }
    if id.contains('/') {
        return Err(SyncError::validation("guest id must not contain '/'"));
    }
    Ok(())
}

// ── Payload validators ──────────────────────────────────────────────

/// Validate a create payload and return its sanitized form
pub fn validate_guest_create(data: &GuestCreate) -> SyncResult<GuestCreate> {
    Ok(GuestCreate {
        full_name: sanitize_text(&data.full_name, &FULL_NAME)?,
        table_name: sanitize_text(&data.table_name, &TABLE_NAME)?,
        companions: validate_companions(data.companions)?,
    })
}

/// Validate an update payload and return its sanitized form
pub fn validate_guest_update(changes: &GuestUpdate) -> SyncResult<GuestUpdate> {
    if changes.is_empty() {
        return Err(SyncError::validation("update contains no fields"));
    }
    Ok(GuestUpdate {
        full_name: changes
            .full_name
            .as_deref()
            .map(|v| sanitize_text(v, &FULL_NAME))
            .transpose()?,
        table_name: changes
            .table_name
            .as_deref()
            .map(|v| sanitize_text(v, &TABLE_NAME))
            .transpose()?,
        companions: changes.companions.map(validate_companions).transpose()?,
        is_present: changes.is_present,
    })
}

/// Validate a whole import batch; the first invalid record rejects everything
pub fn validate_import(guests: &[GuestCreate]) -> SyncResult<Vec<GuestCreate>> {
    guests
        .iter()
        .enumerate()
        .map(|(index, guest)| {
            validate_guest_create(guest).map_err(|e| match e {
                SyncError::Validation { message, .. } => SyncError::invalid(
                    ErrorCode::ImportRejected,
                    format!("record {index}: {message}"),
                ),
                other => other,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_char_name_rejected() {
        let err = validate_guest_create(&GuestCreate::new("A", "T1", 0)).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.error_code(), ErrorCode::GuestNameInvalid);
        assert!(err.to_string().contains("fullName is too short"));
    }

    #[test]
    fn test_create_is_trimmed() {
        let clean = validate_guest_create(&GuestCreate::new("  Jean Dupont ", " Table 1", 2)).unwrap();
        assert_eq!(clean.full_name, "Jean Dupont");
        assert_eq!(clean.table_name, "Table 1");
    }

    #[test]
    fn test_whitespace_only_is_empty() {
        let err = validate_guest_create(&GuestCreate::new("   ", "T1", 0)).unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn test_length_bounds_count_chars() {
        let name = "é".repeat(MAX_NAME_LEN);
        assert!(validate_guest_create(&GuestCreate::new(name, "T1", 0)).is_ok());

        let name = "x".repeat(MAX_NAME_LEN + 1);
        assert!(validate_guest_create(&GuestCreate::new(name, "T1", 0)).is_err());

        let table = "t".repeat(MAX_TABLE_LEN + 1);
        let err = validate_guest_create(&GuestCreate::new("Jean", table, 0)).unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::TableNameInvalid);
    }

    #[test]
    fn test_companions_bounds() {
        assert!(validate_guest_create(&GuestCreate::new("Jean", "T1", 10)).is_ok());
        let err = validate_guest_create(&GuestCreate::new("Jean", "T1", 11)).unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::CompanionsOutOfRange);
    }

    #[test]
    fn test_update_validation() {
        assert!(validate_guest_update(&GuestUpdate::default()).is_err());

        let changes = GuestUpdate {
            full_name: Some(" Marie Curie ".to_string()),
            ..Default::default()
        };
        let clean = validate_guest_update(&changes).unwrap();
        assert_eq!(clean.full_name.as_deref(), Some("Marie Curie"));

        let changes = GuestUpdate {
            companions: Some(42),
            ..Default::default()
        };
        assert!(validate_guest_update(&changes).is_err());
    }

    #[test]
    fn test_guest_id_format() {
        assert!(validate_guest_id("nonexistent-id").is_ok());
        assert!(validate_guest_id("").is_err());
        assert!(validate_guest_id("guests/abc").is_err());
    }

    #[test]
    fn test_import_reports_record_index() {
        let batch = vec![
            GuestCreate::new("Jean Dupont", "Table 1", 2),
            GuestCreate::new("B", "Table 2", 0),
        ];
        let err = validate_import(&batch).unwrap_err();
        assert!(err.to_string().contains("record 1"));
        assert_eq!(err.error_code(), ErrorCode::ImportRejected);
    }
}
