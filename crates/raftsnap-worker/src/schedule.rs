//! Schedule derived from what the storage backends already hold.

use chrono::{DateTime, Utc};
use raftsnap_core::AgentError;
use raftsnap_storage::SnapshotStore;
use std::sync::Arc;
use std::time::Duration;

/// When the next snapshot is due, computed fresh each cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleDecision {
    /// Newest artifact across all backends, `None` if nothing was found.
    pub last_snapshot: Option<DateTime<Utc>>,
    pub next_due: DateTime<Utc>,
    /// Zero when no snapshot exists yet or the schedule is overdue.
    pub wait: Duration,
}

impl ScheduleDecision {
    pub fn compute(
        last_snapshot: Option<DateTime<Utc>>,
        frequency: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        let Some(last) = last_snapshot else {
            return Self {
                last_snapshot: None,
                next_due: now,
                wait: Duration::ZERO,
            };
        };

        let next_due = chrono::Duration::from_std(frequency)
            .ok()
            .and_then(|freq| last.checked_add_signed(freq))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        // Negative (overdue) converts to an error, which means "now".
        let wait = (next_due - now).to_std().unwrap_or(Duration::ZERO);

        Self {
            last_snapshot: Some(last),
            next_due,
            wait,
        }
    }

    pub fn is_overdue(&self) -> bool {
        self.last_snapshot.is_some() && self.wait.is_zero()
    }
}

/// True when `last_snapshot` is younger than `window` at `now`.
///
/// A zero window never matches. Timestamps ahead of `now` count as recent.
pub fn is_recent(last_snapshot: Option<DateTime<Utc>>, window: Duration, now: DateTime<Utc>) -> bool {
    if window.is_zero() {
        return false;
    }
    match last_snapshot {
        None => false,
        Some(last) => match (now - last).to_std() {
            Ok(age) => age < window,
            Err(_) => true,
        },
    }
}

/// Reads the newest artifact timestamp across every backend.
#[derive(Clone)]
pub struct ScheduleSynchronizer {
    stores: Vec<Arc<dyn SnapshotStore>>,
}

impl ScheduleSynchronizer {
    pub fn new(stores: Vec<Arc<dyn SnapshotStore>>) -> Self {
        Self { stores }
    }

    /// Global maximum `last_modified` over all backends.
    ///
    /// A backend whose listing fails is logged and left out.
    pub async fn last_snapshot_instant(&self) -> Option<DateTime<Utc>> {
        let mut latest: Option<DateTime<Utc>> = None;

        for store in &self.stores {
            match store.list().await {
                Ok(records) => {
                    let newest = records.iter().map(|r| r.last_modified).max();
                    tracing::debug!(
                        backend = store.name(),
                        count = records.len(),
                        newest = ?newest,
                        "Listed snapshots for schedule"
                    );
                    latest = latest.max(newest);
                }
                Err(e) => {
                    let err = AgentError::Schedule(format!("{}: {}", store.name(), e));
                    tracing::warn!(
                        backend = store.name(),
                        error = %err,
                        "Failed to list snapshots, skipping backend for schedule"
                    );
                }
            }
        }

        latest
    }

    pub async fn decide(&self, frequency: Duration, now: DateTime<Utc>) -> ScheduleDecision {
        ScheduleDecision::compute(self.last_snapshot_instant().await, frequency, now)
    }
}
