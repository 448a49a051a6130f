//! Offline inspector for the local guest-sync state
//!
//! ```text
//! guest-sync [show]   pending actions, optimistic guest list and stats as JSON
//! guest-sync clear    drop every pending action
//! ```

use anyhow::Context;
use guest_sync::projector::project;
use guest_sync::{ActionQueue, Config, RedbStorage, SnapshotCache, setup_environment};
use shared::models::GuestStats;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment (.env, logging, work dir)
    dotenv::dotenv().ok();
    let config = Config::from_env();
    setup_environment(&config).context("failed to prepare work directory")?;

    // 2. Local state
    let db_path = config.db_path();
    tracing::info!(path = %db_path.display(), "Opening local database");
    let storage = Arc::new(
        RedbStorage::open(&db_path)
            .with_context(|| format!("failed to open {}", db_path.display()))?,
    );
    let queue = ActionQueue::load(storage.clone())
        .await
        .context("failed to load pending actions")?;
    let cache = SnapshotCache::new(storage);

    // 3. Command
    let command = std::env::args().nth(1).unwrap_or_else(|| "show".to_string());
    match command.as_str() {
        "show" => {
            let snapshot = cache.load().await;
            let pending = queue.list();
            let guests = project(&snapshot, &pending);
            let stats = GuestStats::from_guests(&guests);
            let report = serde_json::json!({
                "pendingActions": pending,
                "guests": guests,
                "stats": stats,
                "cachedGuests": snapshot.len(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        "clear" => {
            let count = queue.len();
            queue.clear().await.context("failed to clear pending actions")?;
            println!("Dropped {count} pending action(s)");
        }
        other => anyhow::bail!("unknown command `{other}` (expected `show` or `clear`)"),
    }

    Ok(())
}
