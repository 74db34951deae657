//! The snapshot control loop.
//!
//! One cycle: check leadership, re-check recency, stream a snapshot into a
//! staging file, save it to every backend in order, then prune each backend
//! that accepted it. All waits observe the shutdown token.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use raftsnap_cluster::{LeadershipGate, SnapshotSource};
use raftsnap_core::{artifact_filename, AgentError, SnapshotConfig};
use raftsnap_storage::{SnapshotReader, SnapshotStore};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use tokio_util::sync::CancellationToken;

use crate::retention::{enforce_retention, RetentionPolicy};
use crate::schedule::{is_recent, ScheduleDecision, ScheduleSynchronizer};

/// Pause after every cycle, whatever its outcome.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub frequency: Duration,
    pub prefix: String,
    pub retention: RetentionPolicy,
    pub timezone: Tz,
    /// A snapshot younger than this suppresses a new one. Zero disables the check.
    pub duplicate_window: Duration,
    pub settle_delay: Duration,
}

impl OrchestratorConfig {
    pub fn from_snapshot_config(config: &SnapshotConfig) -> Self {
        Self {
            frequency: config.frequency,
            prefix: config.prefix.clone(),
            retention: RetentionPolicy::new(config.retain),
            timezone: config.timezone,
            duplicate_window: config.duplicate_window(),
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NotLeader,
    Duplicate { last_snapshot: DateTime<Utc> },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadSummary {
    pub filename: String,
    pub size_bytes: u64,
    /// Backend names, in upload order.
    pub uploaded: Vec<String>,
    pub failed: Vec<String>,
}

#[derive(Debug)]
pub enum CycleOutcome {
    Skipped(SkipReason),
    Failed(AgentError),
    Completed(UploadSummary),
    Cancelled,
}

pub struct SnapshotOrchestrator {
    gate: Arc<dyn LeadershipGate>,
    source: Arc<dyn SnapshotSource>,
    stores: Vec<Arc<dyn SnapshotStore>>,
    synchronizer: ScheduleSynchronizer,
    config: OrchestratorConfig,
}

/// Run `fut` unless `shutdown` fires first. Cancellation wins ties.
async fn or_cancelled<F: Future>(shutdown: &CancellationToken, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = shutdown.cancelled() => None,
        out = fut => Some(out),
    }
}

impl SnapshotOrchestrator {
    pub fn new(
        gate: Arc<dyn LeadershipGate>,
        source: Arc<dyn SnapshotSource>,
        stores: Vec<Arc<dyn SnapshotStore>>,
        config: OrchestratorConfig,
    ) -> Self {
        let synchronizer = ScheduleSynchronizer::new(stores.clone());
        Self {
            gate,
            source,
            stores,
            synchronizer,
            config,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Loop until `shutdown` is cancelled.
    pub async fn run(&self, shutdown: CancellationToken) {
        tracing::info!(
            frequency_secs = self.config.frequency.as_secs(),
            backends = self.stores.len(),
            "Snapshot orchestrator started"
        );

        loop {
            let Some(decision) = or_cancelled(
                &shutdown,
                self.synchronizer.decide(self.config.frequency, Utc::now()),
            )
            .await
            else {
                break;
            };
            self.log_decision(&decision);

            if !decision.wait.is_zero()
                && or_cancelled(&shutdown, tokio::time::sleep(decision.wait))
                    .await
                    .is_none()
            {
                break;
            }

            if let CycleOutcome::Cancelled = self.run_cycle(&shutdown).await {
                break;
            }

            if or_cancelled(&shutdown, tokio::time::sleep(self.config.settle_delay))
                .await
                .is_none()
            {
                break;
            }
        }

        tracing::info!("Snapshot orchestrator stopped");
    }

    fn log_decision(&self, decision: &ScheduleDecision) {
        let tz = self.config.timezone;
        match decision.last_snapshot {
            None => tracing::info!("No existing snapshots found, taking snapshot now"),
            Some(last) if decision.is_overdue() => tracing::info!(
                last_snapshot = %last.with_timezone(&tz),
                "Snapshot overdue, taking snapshot now"
            ),
            Some(last) => tracing::info!(
                last_snapshot = %last.with_timezone(&tz),
                next_snapshot = %decision.next_due.with_timezone(&tz),
                sleep_secs = decision.wait.as_secs(),
                "Schedule synchronized with storage"
            ),
        }
    }

    /// One pass from the leadership check to retention. Never panics on
    /// backend or cluster errors; they are logged and reported in the outcome.
    pub async fn run_cycle(&self, shutdown: &CancellationToken) -> CycleOutcome {
        let Some(leader) = or_cancelled(shutdown, self.gate.is_leader()).await else {
            return CycleOutcome::Cancelled;
        };
        match leader {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!("Not the leader, skipping snapshot");
                return CycleOutcome::Skipped(SkipReason::NotLeader);
            }
            Err(e) => {
                let err = AgentError::from(e);
                tracing::error!(error = %err, "Failed to check leadership");
                return CycleOutcome::Failed(err);
            }
        }

        if !self.config.duplicate_window.is_zero() {
            let Some(last) = or_cancelled(shutdown, self.synchronizer.last_snapshot_instant()).await
            else {
                return CycleOutcome::Cancelled;
            };
            if let Some(last) = last.filter(|l| is_recent(Some(*l), self.config.duplicate_window, Utc::now())) {
                tracing::info!(
                    last_snapshot = %last.with_timezone(&self.config.timezone),
                    window_secs = self.config.duplicate_window.as_secs(),
                    "Recent snapshot found, skipping to avoid duplicate"
                );
                return CycleOutcome::Skipped(SkipReason::Duplicate { last_snapshot: last });
            }
        }

        // Removed from disk when dropped, on every return path below.
        let staging = match NamedTempFile::new() {
            Ok(file) => file,
            Err(e) => {
                let err = AgentError::from(e);
                tracing::error!(error = %err, "Failed to create staging file");
                return CycleOutcome::Failed(err);
            }
        };

        let size_bytes = match self.acquire(&staging, shutdown).await {
            Some(Ok(size)) => size,
            Some(Err(err)) => return CycleOutcome::Failed(err),
            None => return CycleOutcome::Cancelled,
        };

        let filename = artifact_filename(&self.config.prefix, Utc::now(), self.config.timezone);
        let mut summary = UploadSummary {
            filename: filename.clone(),
            size_bytes,
            ..Default::default()
        };

        for store in &self.stores {
            if shutdown.is_cancelled() {
                tracing::warn!(
                    filename = %filename,
                    remaining_backend = store.name(),
                    "Shutdown requested, abandoning remaining uploads"
                );
                return CycleOutcome::Cancelled;
            }

            if self.upload(store.as_ref(), &staging, &filename).await {
                summary.uploaded.push(store.name().to_string());
                self.prune(store.as_ref()).await;
            } else {
                summary.failed.push(store.name().to_string());
            }
        }

        tracing::info!(
            filename = %summary.filename,
            uploaded = summary.uploaded.len(),
            failed = summary.failed.len(),
            "Snapshot cycle complete"
        );
        CycleOutcome::Completed(summary)
    }

    async fn acquire(
        &self,
        staging: &NamedTempFile,
        shutdown: &CancellationToken,
    ) -> Option<Result<u64, AgentError>> {
        let mut sink = match staging.reopen() {
            Ok(file) => tokio::fs::File::from_std(file),
            Err(e) => {
                let err = AgentError::from(e);
                tracing::error!(error = %err, "Failed to open staging file");
                return Some(Err(err));
            }
        };

        let started = Instant::now();
        let result = or_cancelled(shutdown, self.source.take_snapshot(&mut sink)).await?;
        match result {
            Ok(size) => {
                tracing::info!(
                    size_bytes = size,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Snapshot acquired"
                );
                Some(Ok(size))
            }
            Err(e) => {
                let err = AgentError::from(e);
                tracing::error!(
                    error = %err,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Failed to take snapshot"
                );
                Some(Err(err))
            }
        }
    }

    /// Save the staged snapshot to one backend, reading it from the start.
    async fn upload(&self, store: &dyn SnapshotStore, staging: &NamedTempFile, filename: &str) -> bool {
        let reader: SnapshotReader = match staging.reopen() {
            Ok(file) => Box::pin(tokio::fs::File::from_std(file)),
            Err(e) => {
                tracing::error!(
                    destination = store.name(),
                    error = %e,
                    "Failed to reopen staging file for upload"
                );
                return false;
            }
        };

        let started = Instant::now();
        match store.save(filename, reader).await {
            Ok(bytes) => {
                tracing::info!(
                    destination = store.name(),
                    key = %filename,
                    size_bytes = bytes,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Snapshot saved"
                );
                true
            }
            Err(e) => {
                tracing::error!(
                    destination = store.name(),
                    key = %filename,
                    error = %e,
                    "Failed to save snapshot"
                );
                false
            }
        }
    }

    async fn prune(&self, store: &dyn SnapshotStore) {
        match enforce_retention(store, &self.config.retention).await {
            Ok(report) if !report.deleted.is_empty() || !report.failed.is_empty() => {
                tracing::info!(
                    backend = store.name(),
                    kept = report.kept,
                    deleted = report.deleted.len(),
                    failed = report.failed.len(),
                    "Retention applied"
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(
                    backend = store.name(),
                    error = %e,
                    "Failed to list snapshots for retention"
                );
            }
        }
    }
}
