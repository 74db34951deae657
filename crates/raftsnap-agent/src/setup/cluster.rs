use anyhow::{Context, Result};
use raftsnap_cluster::ClusterClient;
use raftsnap_core::{AgentError, Config};
use std::sync::Arc;

/// Connect and authenticate once. Failure here stops the process.
pub async fn setup_cluster(config: &Config) -> Result<Arc<ClusterClient>> {
    let client = ClusterClient::connect(&config.cluster)
        .await
        .map_err(AgentError::from)
        .context("Failed to authenticate with cluster API")?;
    tracing::info!(address = client.base_url(), "Cluster API client ready");
    Ok(Arc::new(client))
}
