mod setup;

use anyhow::Context;
use raftsnap_core::{Config, LogFormat};
use tokio_util::sync::CancellationToken;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Read before the full config so configuration errors are logged in the chosen format.
    raftsnap_infra::init_telemetry(LogFormat::from_env())?;

    let result = run().await;
    if let Err(e) = &result {
        tracing::error!(error = %format!("{:#}", e), "Agent failed to start");
    }

    result
}

async fn run() -> anyhow::Result<()> {
    let config = Config::from_env().context("Configuration validation failed")?;
    let orchestrator = setup::initialize_agent(&config).await?;

    let shutdown = CancellationToken::new();
    let listener = raftsnap_infra::spawn_shutdown_listener(shutdown.clone());

    orchestrator.run(shutdown.clone()).await;

    shutdown.cancel();
    if let Err(e) = listener.await {
        tracing::warn!(error = %e, "Shutdown listener task failed");
    }
    tracing::info!("Raft snapshot agent stopped");
    Ok(())
}
