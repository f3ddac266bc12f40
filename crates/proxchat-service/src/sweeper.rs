//! Background TTL sweepers.
//!
//! The backend's TTLs cover the common case; these loops clean up what
//! TTLs cannot see: expired members inside live sorted sets, and cell
//! sets emptied one member at a time. Partial failures are logged and
//! skipped, never fatal.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::location::LocationService;
use crate::message::MessageStore;

/// Message sweep cadence.
const MESSAGE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Location/session index sweep cadence.
const INDEX_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Remove expired entries from every per-cell message log, once a
/// minute, until shutdown.
pub async fn run_message_sweeper(messages: Arc<MessageStore>, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(MESSAGE_SWEEP_INTERVAL);
    ticker.tick().await; // First tick fires immediately; skip it.

    info!("message sweeper started");
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = messages.sweep().await {
                    error!(error = %e, "message sweep failed");
                }
            }
            _ = shutdown.cancelled() => {
                info!("message sweeper stopped");
                return;
            }
        }
    }
}

/// Drop empty cell-membership sets every five minutes, until shutdown.
/// Session records need no sweep: their TTL is authoritative.
pub async fn run_index_sweeper(locations: Arc<LocationService>, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(INDEX_SWEEP_INTERVAL);
    ticker.tick().await;

    info!("index sweeper started");
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = locations.sweep().await {
                    error!(error = %e, "cell index sweep failed");
                }
            }
            _ = shutdown.cancelled() => {
                info!("index sweeper stopped");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proxchat_core::config::store::MemoryStoreConfig;
    use proxchat_core::config::GeoConfig;
    use proxchat_store::memory::MemoryStoreProvider;
    use proxchat_store::StoreManager;

    #[tokio::test]
    async fn sweepers_exit_on_shutdown() {
        let store = Arc::new(StoreManager::from_provider(Arc::new(
            MemoryStoreProvider::new(&MemoryStoreConfig::default()),
        )));
        let messages = Arc::new(MessageStore::new(store.clone(), 30));
        let locations = Arc::new(LocationService::new(store, &GeoConfig::default()));

        let shutdown = CancellationToken::new();
        let h1 = tokio::spawn(run_message_sweeper(messages, shutdown.clone()));
        let h2 = tokio::spawn(run_index_sweeper(locations, shutdown.clone()));

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), async {
            h1.await.unwrap();
            h2.await.unwrap();
        })
        .await
        .expect("sweepers must exit promptly on shutdown");
    }
}
