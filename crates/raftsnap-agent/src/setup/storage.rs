//! Storage setup and initialization

use anyhow::{Context, Result};
use raftsnap_core::Config;
use raftsnap_storage::{create_storages, SnapshotStore};
use std::sync::Arc;

/// Build every enabled backend, in upload order.
pub async fn setup_storage(config: &Config) -> Result<Vec<Arc<dyn SnapshotStore>>> {
    tracing::info!("Initializing storage backends...");
    let stores = create_storages(&config.storage, &config.snapshot.prefix)
        .await
        .context("Failed to initialize storage backends")?;
    tracing::info!(count = stores.len(), "Storage backends initialized");
    Ok(stores)
}
