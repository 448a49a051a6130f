//! Guest Sync - offline-first synchronization core for wedding guest lists
//!
//! # Architecture
//!
//! - **Facade** (`service`): validated writes, merged observable view
//! - **Queue** (`queue`): durable pending actions, replay order
//! - **Cache** (`cache`): last confirmed guest snapshot
//! - **Projector** (`projector`): snapshot + queue → optimistic list
//! - **Remote** (`remote`): document store seam, live subscription, audit
//! - **Sync** (`sync`): queue drain, background worker, connectivity
//!
//! # Module layout
//!
//! ```text
//! guest-sync/src/
//! ├── core/        # Configuration
//! ├── storage/     # Local key-value storage (redb, memory)
//! ├── queue.rs     # Pending action queue
//! ├── cache.rs     # Snapshot cache
//! ├── projector/   # Optimistic projection (action appliers)
//! ├── remote/      # Remote store trait, codec, synchronizer
//! ├── audit/       # Fire-and-forget audit trail
//! ├── sync/        # Orchestrator, worker, connectivity
//! ├── service/     # GuestService facade
//! └── utils/       # Logging, validation
//! ```

pub mod audit;
pub mod cache;
pub mod core;
pub mod error;
pub mod projector;
pub mod queue;
pub mod remote;
pub mod service;
pub mod storage;
pub mod sync;
pub mod utils;

pub use cache::SnapshotCache;
pub use core::Config;
pub use error::{SyncError, SyncResult};
pub use queue::ActionQueue;
pub use remote::{MemoryRemoteStore, RemoteStore, RemoteSynchronizer};
pub use service::{GuestNotice, GuestService, GuestView};
pub use storage::{LocalStorage, MemoryStorage, RedbStorage};
pub use sync::{Connectivity, SyncOrchestrator, SyncReport};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// Initialize logging and create the work directory
pub fn setup_environment(config: &Config) -> std::io::Result<()> {
    init_logger_with_file(
        Some(&config.log_level),
        Some(config.log_json),
        config.log_dir.as_deref(),
    );
    std::fs::create_dir_all(&config.work_dir)
}
