//! Per-backend retention: keep the newest N artifacts, delete the rest.

use raftsnap_storage::{FileRecord, SnapshotStore, StorageResult};

/// How many artifacts each backend keeps. `max_retain == 0` disables pruning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub max_retain: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self { max_retain: 5 }
    }
}

impl RetentionPolicy {
    pub fn new(max_retain: usize) -> Self {
        Self { max_retain }
    }

    pub fn is_disabled(&self) -> bool {
        self.max_retain == 0
    }

    /// Records beyond the newest `max_retain`, newest first.
    ///
    /// Ties on `last_modified` keep listing order.
    pub fn select_stale(&self, mut records: Vec<FileRecord>) -> Vec<FileRecord> {
        if self.is_disabled() || records.len() <= self.max_retain {
            return Vec::new();
        }
        records.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
        records.split_off(self.max_retain)
    }
}

/// Outcome of one retention pass on one backend
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionReport {
    pub kept: usize,
    pub deleted: Vec<String>,
    pub failed: Vec<String>,
}

/// Apply `policy` to `store`.
///
/// Only a failing listing is returned as an error. Each deletion is attempted
/// on its own; failures are logged and collected in the report.
pub async fn enforce_retention(
    store: &dyn SnapshotStore,
    policy: &RetentionPolicy,
) -> StorageResult<RetentionReport> {
    if policy.is_disabled() {
        return Ok(RetentionReport::default());
    }

    let records = store.list().await?;
    let total = records.len();
    let stale = policy.select_stale(records);
    let mut report = RetentionReport {
        kept: total - stale.len(),
        ..Default::default()
    };

    for record in stale {
        match store.delete(&record.key).await {
            Ok(()) => {
                tracing::info!(
                    backend = store.name(),
                    key = %record.key,
                    "Deleted old snapshot"
                );
                report.deleted.push(record.key);
            }
            Err(e) => {
                tracing::error!(
                    backend = store.name(),
                    key = %record.key,
                    error = %e,
                    "Failed to delete old snapshot"
                );
                report.failed.push(record.key);
            }
        }
    }

    Ok(report)
}
