use crate::keys::{matches_prefix, prefix_dir, validate_key};
use crate::traits::{FileRecord, SnapshotReader, SnapshotStore, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::buffered::BufWriter;
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectMeta, ObjectStore, ObjectStoreExt};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

/// Connection settings for an S3-compatible bucket
#[derive(Clone, Debug, Default)]
pub struct S3Settings {
    pub bucket: String,
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Custom endpoint for S3-compatible providers
    /// (e.g., "http://localhost:9000" for MinIO). Forces path-style addressing.
    pub endpoint: Option<String>,
}

/// S3 storage implementation
///
/// One long-lived client is built at construction. Listing follows every
/// page of the bucket listing before returning.
#[derive(Clone)]
pub struct S3Storage {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    prefix: String,
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// Credentials not given explicitly are picked up from the environment
    /// (`AWS_*` variables) by the builder.
    pub fn new(settings: S3Settings, prefix: impl Into<String>) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(settings.region.clone())
            .with_bucket_name(settings.bucket.clone());

        if let (Some(access_key_id), Some(secret_access_key)) =
            (&settings.access_key_id, &settings.secret_access_key)
        {
            builder = builder
                .with_access_key_id(access_key_id.clone())
                .with_secret_access_key(secret_access_key.clone());
        }

        if let Some(ref endpoint) = settings.endpoint {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http)
                .with_virtual_hosted_style_request(false);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(Self::with_store(Arc::new(store), settings.bucket, prefix))
    }

    /// Wrap an already-built object store (used by tests with an in-memory store).
    pub fn with_store(
        store: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        S3Storage {
            store,
            bucket: bucket.into(),
            prefix: prefix.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn to_record(&self, meta: ObjectMeta) -> Option<FileRecord> {
        let key = meta.location.to_string();
        matches_prefix(&key, &self.prefix).then(|| FileRecord::new(key, meta.last_modified))
    }
}

#[async_trait]
impl SnapshotStore for S3Storage {
    fn name(&self) -> &str {
        "S3"
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }

    async fn save(&self, filename: &str, mut reader: SnapshotReader) -> StorageResult<u64> {
        validate_key(filename)?;
        let location = Path::from(filename);
        let start = std::time::Instant::now();

        // Multipart upload; nothing is visible until shutdown completes it.
        let mut writer = BufWriter::new(self.store.clone(), location);
        let result = async {
            let written = tokio::io::copy(&mut reader, &mut writer).await?;
            writer.shutdown().await?;
            Ok::<u64, std::io::Error>(written)
        }
        .await;

        match result {
            Ok(size) => {
                tracing::info!(
                    bucket = %self.bucket,
                    key = %filename,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload successful"
                );
                Ok(size)
            }
            Err(e) => {
                if let Err(abort) = writer.abort().await {
                    tracing::warn!(error = %abort, key = %filename, "Failed to abort S3 upload");
                }
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %filename,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload failed"
                );
                Err(StorageError::UploadFailed(e.to_string()))
            }
        }
    }

    async fn list(&self) -> StorageResult<Vec<FileRecord>> {
        let start = std::time::Instant::now();
        let list_prefix = prefix_dir(&self.prefix).map(Path::from);

        let objects: Vec<ObjectMeta> = self
            .store
            .list(list_prefix.as_ref())
            .try_collect()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    prefix = %self.prefix,
                    "S3 list failed"
                );
                StorageError::ListFailed(e.to_string())
            })?;

        let records: Vec<FileRecord> = objects
            .into_iter()
            .filter_map(|meta| self.to_record(meta))
            .collect();

        tracing::debug!(
            bucket = %self.bucket,
            prefix = %self.prefix,
            count = records.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 list successful"
        );

        Ok(records)
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        let start = std::time::Instant::now();
        let location = Path::from(key);

        match self.store.delete(&location).await {
            Ok(()) | Err(ObjectStoreError::NotFound { .. }) => {
                tracing::debug!(
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete successful"
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete failed"
                );
                Err(StorageError::DeleteFailed(e.to_string()))
            }
        }
    }
}
