//! Data models
//!
//! Shared between the sync core and the UI layer. Everything here is
//! serialized with camelCase field names, which is also the layout of the
//! locally persisted JSON and of the remote guest documents.

pub mod guest;
pub mod pending_action;
pub mod stats;
pub mod sync;

// Re-exports
pub use guest::*;
pub use pending_action::*;
pub use stats::*;
pub use sync::*;
