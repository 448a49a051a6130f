//! Background sync worker
//!
//! Drains the queue on start (if online), on every offline → online
//! transition, and periodically while online with pending actions.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::{Connectivity, SyncOrchestrator};
use crate::error::SyncError;

pub struct SyncWorker {
    orchestrator: Arc<SyncOrchestrator>,
    connectivity: Connectivity,
    interval: Duration,
    shutdown: CancellationToken,
}

impl SyncWorker {
    pub fn new(
        orchestrator: Arc<SyncOrchestrator>,
        connectivity: Connectivity,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            orchestrator,
            connectivity,
            interval: interval.max(Duration::from_secs(1)),
            shutdown,
        }
    }

    pub async fn run(self) {
        tracing::info!(interval_secs = self.interval.as_secs(), "SyncWorker started");

        let mut online_rx = self.connectivity.subscribe();
        let mut was_online = *online_rx.borrow_and_update();

        let mut ticker = tokio::time::interval(self.interval);
        ticker.tick().await; // skip immediate tick

        if was_online && self.orchestrator.has_pending() {
            self.drain("startup").await;
        }

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!("SyncWorker shutting down");
                    break;
                }

                changed = online_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let online = *online_rx.borrow_and_update();
                    if online && !was_online {
                        self.drain("reconnect").await;
                    }
                    was_online = online;
                }

                _ = ticker.tick() => {
                    if self.connectivity.is_online() && self.orchestrator.has_pending() {
                        self.drain("interval").await;
                    }
                }
            }
        }
    }

    async fn drain(&self, trigger: &'static str) {
        match self.orchestrator.drain().await {
            Ok(report) => {
                tracing::info!(
                    trigger,
                    synced = report.synced,
                    retried = report.retried,
                    dropped = report.dropped,
                    "Pending actions drained"
                );
            }
            Err(SyncError::DrainInProgress) => {
                tracing::debug!(trigger, "Drain already running, skipped");
            }
            Err(e) => {
                tracing::warn!(trigger, "Drain failed: {e}");
            }
        }
    }
}
