use crate::keys::{matches_prefix, validate_key};
use crate::traits::{FileRecord, SnapshotReader, SnapshotStore, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

const PARTIAL_SUFFIX: &str = ".partial";

/// Local filesystem storage implementation
#[derive(Clone, Debug)]
pub struct LocalStorage {
    base_path: PathBuf,
    prefix: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for snapshots (e.g., "/var/backups/vault")
    /// * `prefix` - Snapshot filename prefix; only matching relative paths are listed
    pub async fn new(base_path: impl Into<PathBuf>, prefix: impl Into<String>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            prefix: prefix.into(),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        Ok(self.base_path.join(key))
    }

    /// Writes land in a hidden sibling first and are renamed into place on success.
    fn partial_path(path: &Path) -> PathBuf {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        path.with_file_name(format!(".{}{}", name, PARTIAL_SUFFIX))
    }

    fn is_partial(path: &Path) -> bool {
        path.file_name()
            .map(|n| {
                let n = n.to_string_lossy();
                n.starts_with('.') && n.ends_with(PARTIAL_SUFFIX)
            })
            .unwrap_or(false)
    }

    /// Relative path with `/` separators on every platform.
    fn relative_key(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.base_path).ok()?;
        let segments: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(segments.join("/"))
    }

    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn write_staged(path: &Path, staging: &Path, mut reader: SnapshotReader) -> std::io::Result<u64> {
        let mut file = fs::File::create(staging).await?;
        let written = tokio::io::copy(&mut reader, &mut file).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(staging, path).await?;
        Ok(written)
    }
}

#[async_trait]
impl SnapshotStore for LocalStorage {
    fn name(&self) -> &str {
        "LocalDisk"
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }

    async fn save(&self, filename: &str, reader: SnapshotReader) -> StorageResult<u64> {
        let path = self.key_to_path(filename)?;
        self.ensure_parent_dir(&path).await?;

        let staging = Self::partial_path(&path);
        let start = std::time::Instant::now();

        match Self::write_staged(&path, &staging, reader).await {
            Ok(size) => {
                tracing::info!(
                    path = %path.display(),
                    key = %filename,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Local storage upload successful"
                );
                Ok(size)
            }
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&staging).await {
                    if cleanup.kind() != ErrorKind::NotFound {
                        tracing::warn!(
                            path = %staging.display(),
                            error = %cleanup,
                            "Failed to remove partial snapshot"
                        );
                    }
                }
                tracing::error!(
                    error = %e,
                    path = %path.display(),
                    key = %filename,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Local storage upload failed"
                );
                Err(StorageError::UploadFailed(format!(
                    "Failed to write file {}: {}",
                    path.display(),
                    e
                )))
            }
        }
    }

    async fn list(&self) -> StorageResult<Vec<FileRecord>> {
        let mut records = Vec::new();
        let mut pending = vec![self.base_path.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound && dir == self.base_path => {
                    return Ok(records);
                }
                Err(e) => {
                    return Err(StorageError::ListFailed(format!(
                        "Failed to read directory {}: {}",
                        dir.display(),
                        e
                    )))
                }
            };

            while let Some(entry) = entries.next_entry().await.map_err(|e| {
                StorageError::ListFailed(format!("Failed to read directory {}: {}", dir.display(), e))
            })? {
                let path = entry.path();
                let file_type = match entry.file_type().await {
                    Ok(file_type) => file_type,
                    Err(_) => continue,
                };
                if file_type.is_dir() {
                    pending.push(path);
                    continue;
                }
                if Self::is_partial(&path) {
                    continue;
                }
                let Some(key) = self.relative_key(&path) else {
                    continue;
                };
                if !matches_prefix(&key, &self.prefix) {
                    continue;
                }
                // Files removed between read_dir and metadata are skipped.
                let modified = match entry.metadata().await.and_then(|m| m.modified()) {
                    Ok(modified) => modified,
                    Err(_) => continue,
                };
                records.push(FileRecord::new(key, DateTime::<Utc>::from(modified)));
            }
        }

        Ok(records)
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), key = %key, "Local storage delete successful");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to delete file {}: {}",
                path.display(),
                e
            ))),
        }
    }
}
