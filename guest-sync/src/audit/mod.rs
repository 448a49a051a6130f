//! Audit trail for guest writes
//!
//! Producers call [`AuditService::log`], which never blocks and never
//! fails. [`AuditWorker`] drains the channel and appends entries to the
//! remote audit collection; its failures are logged and dropped.

mod service;
mod types;
mod worker;

pub use service::AuditService;
pub use types::{AuditAction, AuditLogRequest};
pub use worker::AuditWorker;
