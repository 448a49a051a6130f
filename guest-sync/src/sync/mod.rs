//! Queue replay
//!
//! - [`SyncOrchestrator`]: one sequential drain pass at a time
//! - [`SyncWorker`]: background trigger (reconnect + interval)
//! - [`Connectivity`]: online/offline signal shared by the facade and the worker

mod connectivity;
mod orchestrator;
mod worker;

pub use connectivity::Connectivity;
pub use orchestrator::{MAX_RETRIES, SyncOrchestrator, SyncReport};
pub use worker::SyncWorker;
