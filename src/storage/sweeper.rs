use crate::storage::{Storage, StorageResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;

/// Background task that purges records whose storage expiry hint has passed.
///
/// Logical expiry is always decided at read time; the sweeper only reclaims
/// space for pastes nobody reads again.
pub struct ExpirySweeper {
    /// Shutdown signal sender
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl ExpirySweeper {
    pub fn spawn(storage: Arc<dyn Storage>, interval_secs: u64) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(Duration::from_secs(interval_secs.max(1)));
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = sweep_once(&storage).await {
                            tracing::error!("Failed to purge expired pastes: {}", e);
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::info!("Shutdown signal received, running final expiry sweep...");
                            if let Err(e) = sweep_once(&storage).await {
                                tracing::error!("Failed to purge expired pastes on shutdown: {}", e);
                            }
                            break;
                        }
                    }
                }
            }
        });

        Self {
            shutdown_tx,
            handle,
        }
    }

    /// Signal shutdown and wait for the final sweep to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.handle.await {
            tracing::error!("Expiry sweeper task failed: {}", e);
        }
    }
}

/// Run a single purge pass against the wall clock.
pub async fn sweep_once(storage: &Arc<dyn Storage>) -> StorageResult<u64> {
    let purged = storage.purge_expired(crate::clock::now_ms()).await?;
    if purged > 0 {
        tracing::info!(purged, "Purged expired pastes");
    }
    Ok(purged)
}
