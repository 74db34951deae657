//! Storage abstraction trait
//!
//! This module defines the SnapshotStore trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::pin::Pin;
use thiserror::Error;
use tokio::io::AsyncRead;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("List failed: {0}")]
    ListFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Byte source handed to `SnapshotStore::save`. Consumed until EOF.
pub type SnapshotReader = Pin<Box<dyn AsyncRead + Send + Unpin>>;

/// One stored snapshot artifact as reported by a backend listing.
///
/// `last_modified` is the backend's own modification time, never an
/// agent-generated timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub key: String,
    pub last_modified: DateTime<Utc>,
}

impl FileRecord {
    pub fn new(key: impl Into<String>, last_modified: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            last_modified,
        }
    }
}

/// Storage abstraction trait
///
/// All snapshot backends (local filesystem, S3) implement this trait. The
/// orchestrator holds a list of `Arc<dyn SnapshotStore>` and never branches on
/// the concrete backend except for logging.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Stable human-readable identifier used in logs and error attribution.
    fn name(&self) -> &str;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;

    /// Write `reader` to `filename`, creating any intermediate structure.
    ///
    /// The artifact must only become visible to `list` once this returns `Ok`.
    /// Returns the number of bytes written.
    async fn save(&self, filename: &str, reader: SnapshotReader) -> StorageResult<u64>;

    /// List artifacts matching the configured prefix, in no particular order.
    ///
    /// An empty or missing storage root is success with no records.
    async fn list(&self) -> StorageResult<Vec<FileRecord>>;

    /// Delete an artifact by key. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;
}
