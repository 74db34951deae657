//! Agent setup and initialization
//!
//! Wiring between configuration, storage backends, the cluster client and
//! the orchestrator, kept out of main.rs so it can be tested.

pub mod cluster;
pub mod storage;

use anyhow::Result;
use raftsnap_core::Config;
use raftsnap_worker::{OrchestratorConfig, SnapshotOrchestrator};

/// Build a ready-to-run orchestrator from validated configuration.
pub async fn initialize_agent(config: &Config) -> Result<SnapshotOrchestrator> {
    log_startup(config);

    let stores = storage::setup_storage(config).await?;
    let client = cluster::setup_cluster(config).await?;

    Ok(SnapshotOrchestrator::new(
        client.clone(),
        client,
        stores,
        OrchestratorConfig::from_snapshot_config(&config.snapshot),
    ))
}

fn log_startup(config: &Config) {
    let backends: Vec<String> = config
        .storage
        .enabled_backends()
        .iter()
        .map(|b| b.to_string())
        .collect();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        cluster_address = %config.cluster.address,
        frequency_secs = config.snapshot.frequency.as_secs(),
        timezone = %config.snapshot.timezone,
        prefix = %config.snapshot.prefix,
        retain = config.snapshot.retain,
        duplicate_window_secs = config.snapshot.duplicate_window().as_secs(),
        backends = %backends.join(","),
        "Starting Raft snapshot agent"
    );
}
