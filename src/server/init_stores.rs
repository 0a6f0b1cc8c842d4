//! Store initialization functions
//!
//! Builds the counter store, deletion queue and tracker from configuration.

use super::config::{AppConfig, StoreBackend};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};
use wahook_core::{
    CounterStore, DeletionQueue, MemoryCounterStore, MemoryDeletionQueue, QrScanTracker,
    RedisCounterStore, RedisDeletionQueue,
};

/// Result of store initialization
pub struct StoreBundle {
    pub store: Arc<dyn CounterStore>,
    pub queue: Arc<dyn DeletionQueue>,
    pub tracker: Arc<QrScanTracker>,
}

/// Initialize the configured backends and the tracker on top of them
pub fn init_stores(config: &AppConfig) -> Result<StoreBundle> {
    let (store, queue): (Arc<dyn CounterStore>, Arc<dyn DeletionQueue>) =
        match config.store.backend {
            StoreBackend::Redis => {
                let store = RedisCounterStore::new(&config.redis.url)
                    .context("Failed to initialize Redis counter store")?;
                let queue = RedisDeletionQueue::with_name(&config.redis.url, &config.queue.name)
                    .context("Failed to initialize Redis deletion queue")?;
                info!(queue = %config.queue.name, "Redis counter store and deletion queue initialized");
                (Arc::new(store), Arc::new(queue))
            }
            StoreBackend::Memory => {
                warn!("Using in-memory counter store and deletion queue (development only)");
                (
                    Arc::new(MemoryCounterStore::new()),
                    Arc::new(MemoryDeletionQueue::new()),
                )
            }
        };

    let tracker = Arc::new(QrScanTracker::with_config(
        store.clone(),
        queue.clone(),
        config.tracker.clone(),
    ));
    info!(
        threshold = config.tracker.threshold,
        ttl_secs = config.tracker.ttl_secs,
        "QR scan tracker initialized"
    );

    Ok(StoreBundle {
        store,
        queue,
        tracker,
    })
}
