//! In-memory fakes for orchestrator tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use chrono_tz::Tz;
use raftsnap_cluster::{ClusterError, ClusterResult, LeadershipGate, SnapshotSource};
use raftsnap_storage::{
    FileRecord, SnapshotReader, SnapshotStore, StorageBackend, StorageError, StorageResult,
};
use raftsnap_worker::{OrchestratorConfig, RetentionPolicy};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const PREFIX: &str = "raft-snapshot-";
pub const SNAPSHOT: &[u8] = b"raft-state-bytes";

pub fn config(retain: usize) -> OrchestratorConfig {
    OrchestratorConfig {
        frequency: Duration::from_secs(3600),
        prefix: PREFIX.to_string(),
        retention: RetentionPolicy::new(retain),
        timezone: Tz::UTC,
        duplicate_window: Duration::from_secs(1800),
        settle_delay: Duration::from_millis(10),
    }
}

/// Timestamps `count` artifacts, the newest `newest_age` before now, one hour apart.
pub fn aged_records(count: usize, newest_age: ChronoDuration) -> Vec<FileRecord> {
    let newest = Utc::now() - newest_age;
    (0..count)
        .map(|i| {
            let at = newest - ChronoDuration::hours(i as i64);
            FileRecord::new(format!("{}old-{}.snap", PREFIX, i), at)
        })
        .collect()
}

#[derive(Default)]
pub struct MemoryStore {
    name: String,
    objects: Mutex<Vec<(FileRecord, Vec<u8>)>>,
    fail_save: bool,
    fail_list: bool,
    fail_delete: Option<String>,
    pub saves: AtomicUsize,
    pub deletes: AtomicUsize,
}

impl MemoryStore {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn seeded(name: &str, records: Vec<FileRecord>) -> Self {
        let store = Self::new(name);
        store
            .objects
            .lock()
            .unwrap()
            .extend(records.into_iter().map(|r| (r, Vec::new())));
        store
    }

    pub fn failing_save(mut self) -> Self {
        self.fail_save = true;
        self
    }

    pub fn failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    /// Refuse to delete `key`; every other deletion succeeds.
    pub fn failing_delete(mut self, key: &str) -> Self {
        self.fail_delete = Some(key.to_string());
        self
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .map(|(r, _)| r.key.clone())
            .collect()
    }

    pub fn content(&self, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .find(|(r, _)| r.key == key)
            .map(|(_, data)| data.clone())
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }

    async fn save(&self, filename: &str, mut reader: SnapshotReader) -> StorageResult<u64> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.fail_save {
            return Err(StorageError::UploadFailed("disk quota exceeded".into()));
        }
        let mut data = Vec::new();
        reader.read_to_end(&mut data).await?;
        let size = data.len() as u64;
        self.objects
            .lock()
            .unwrap()
            .push((FileRecord::new(filename, Utc::now()), data));
        Ok(size)
    }

    async fn list(&self) -> StorageResult<Vec<FileRecord>> {
        if self.fail_list {
            return Err(StorageError::ListFailed("connection reset".into()));
        }
        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .map(|(r, _)| r.clone())
            .collect())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete.as_deref() == Some(key) {
            return Err(StorageError::DeleteFailed(format!("{}: access denied", key)));
        }
        self.objects.lock().unwrap().retain(|(r, _)| r.key != key);
        Ok(())
    }
}

/// Leadership answer; `None` makes the check itself fail.
pub struct FakeGate {
    leader: Option<bool>,
    pub calls: AtomicUsize,
}

impl FakeGate {
    fn answering(leader: Option<bool>) -> Self {
        Self {
            leader,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn leader() -> Self {
        Self::answering(Some(true))
    }

    pub fn follower() -> Self {
        Self::answering(Some(false))
    }

    pub fn erroring() -> Self {
        Self::answering(None)
    }
}

#[async_trait]
impl LeadershipGate for FakeGate {
    async fn is_leader(&self) -> ClusterResult<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.leader.ok_or_else(|| ClusterError::Status {
            status: 503,
            body: r#"{"errors":["Vault is sealed"]}"#.to_string(),
        })
    }
}

pub enum SourceBehavior {
    Bytes(Vec<u8>),
    Fail { status: u16, body: &'static str },
    Hang,
}

pub struct FakeSource {
    behavior: SourceBehavior,
    pub calls: AtomicUsize,
}

impl FakeSource {
    pub fn new(behavior: SourceBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn bytes() -> Self {
        Self::new(SourceBehavior::Bytes(SNAPSHOT.to_vec()))
    }
}

#[async_trait]
impl SnapshotSource for FakeSource {
    async fn take_snapshot(&self, sink: &mut (dyn AsyncWrite + Send + Unpin)) -> ClusterResult<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            SourceBehavior::Bytes(data) => {
                sink.write_all(data).await?;
                sink.flush().await?;
                Ok(data.len() as u64)
            }
            SourceBehavior::Fail { status, body } => Err(ClusterError::Status {
                status: *status,
                body: body.to_string(),
            }),
            SourceBehavior::Hang => {
                std::future::pending::<()>().await;
                Ok(0)
            }
        }
    }
}
