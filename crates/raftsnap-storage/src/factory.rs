#[cfg(feature = "storage-local")]
use crate::LocalStorage;
#[cfg(feature = "storage-s3")]
use crate::{S3Settings, S3Storage};
use crate::{SnapshotStore, StorageBackend, StorageError, StorageResult};
use raftsnap_core::StorageConfig;
use std::sync::Arc;

/// Create every enabled storage backend, in upload order (local, then S3).
///
/// Fails when no backend is enabled or an enabled backend cannot be built.
pub async fn create_storages(
    config: &StorageConfig,
    prefix: &str,
) -> StorageResult<Vec<Arc<dyn SnapshotStore>>> {
    let mut storages: Vec<Arc<dyn SnapshotStore>> = Vec::new();

    for backend in config.enabled_backends() {
        match backend {
            #[cfg(feature = "storage-local")]
            StorageBackend::Local => {
                let storage = LocalStorage::new(config.local_path.clone(), prefix).await?;
                tracing::info!(
                    backend = "Local",
                    path = %config.local_path.display(),
                    "Storage enabled"
                );
                storages.push(Arc::new(storage));
            }

            #[cfg(not(feature = "storage-local"))]
            StorageBackend::Local => {
                return Err(StorageError::ConfigError(
                    "Local storage backend not available (storage-local feature not enabled)"
                        .to_string(),
                ))
            }

            #[cfg(feature = "storage-s3")]
            StorageBackend::S3 => {
                let bucket = config.s3_bucket.clone().ok_or_else(|| {
                    StorageError::ConfigError("STORAGE_S3_BUCKET not configured".to_string())
                })?;
                let settings = S3Settings {
                    bucket: bucket.clone(),
                    region: config.s3_region.clone(),
                    access_key_id: config.s3_access_key_id.clone(),
                    secret_access_key: config.s3_secret_access_key.clone(),
                    endpoint: config.s3_endpoint.clone(),
                };
                let storage = S3Storage::new(settings, prefix)?;
                tracing::info!(backend = "S3", bucket = %bucket, "Storage enabled");
                storages.push(Arc::new(storage));
            }

            #[cfg(not(feature = "storage-s3"))]
            StorageBackend::S3 => {
                return Err(StorageError::ConfigError(
                    "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
                ))
            }
        }
    }

    if storages.is_empty() {
        return Err(StorageError::ConfigError(
            "No storage provider enabled".to_string(),
        ));
    }

    Ok(storages)
}

#[cfg(all(test, feature = "storage-local", feature = "storage-s3"))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config(local: bool, s3: bool) -> StorageConfig {
        StorageConfig {
            enable_local: local,
            enable_s3: s3,
            local_path: std::env::temp_dir().join("raftsnap-factory-unused"),
            s3_bucket: Some("backups".to_string()),
            s3_region: "us-east-1".to_string(),
            s3_access_key_id: Some("key".to_string()),
            s3_secret_access_key: Some("secret".to_string()),
            s3_endpoint: Some("http://localhost:9000".to_string()),
        }
    }

    #[tokio::test]
    async fn creates_backends_in_upload_order() {
        let dir = tempdir().unwrap();
        let mut config = config(true, true);
        config.local_path = dir.path().to_path_buf();

        let storages = create_storages(&config, "raft-").await.unwrap();
        let names: Vec<_> = storages.iter().map(|s| s.name().to_string()).collect();
        assert_eq!(names, vec!["LocalDisk", "S3"]);
    }

    #[tokio::test]
    async fn refuses_empty_backend_set() {
        let result = create_storages(&config(false, false), "raft-").await;
        assert!(matches!(result, Err(StorageError::ConfigError(_))));
    }
}
