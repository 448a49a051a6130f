//! Error categories, derived from the code range

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Which part of the system an [`ErrorCode`] belongs to
///
/// The UI groups messages by category: guest errors are shown next to the
/// form, sync errors in the status banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// 0xxx
    General,
    /// 1xxx, session and sign-in
    Auth,
    /// 2xxx, guest records and their validation
    Guest,
    /// 3xxx, queue replay and remote writes
    Sync,
    /// 9xxx, plus any unassigned range
    System,
}

impl ErrorCategory {
    pub fn from_code(code: u16) -> Self {
        match code / 1000 {
            0 => Self::General,
            1 => Self::Auth,
            2 => Self::Guest,
            3 => Self::Sync,
            _ => Self::System,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Auth => "auth",
            Self::Guest => "guest",
            Self::Sync => "sync",
            Self::System => "system",
        }
    }
}

impl ErrorCode {
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}
