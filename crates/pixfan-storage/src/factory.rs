#[cfg(feature = "storage-memory")]
use crate::MemoryStorage;
#[cfg(feature = "storage-s3")]
use crate::S3Storage;
use crate::{ObjectStorage, StorageBackend, StorageError, StorageResult};
use pixfan_core::StorageConfig;
use std::sync::Arc;

/// The two storage locations of the pipeline.
///
/// When the source and derived buckets have the same name both fields point
/// at the same instance.
#[derive(Clone)]
pub struct StorageSet {
    pub uploads: Arc<dyn ObjectStorage>,
    pub resized: Arc<dyn ObjectStorage>,
}

impl StorageSet {
    pub fn new(uploads: Arc<dyn ObjectStorage>, resized: Arc<dyn ObjectStorage>) -> Self {
        Self { uploads, resized }
    }
}

/// Create the storage backends based on configuration
pub fn create_storage(config: &StorageConfig) -> StorageResult<StorageSet> {
    let shared = config.shares_bucket();

    match config.backend {
        #[cfg(feature = "storage-s3")]
        StorageBackend::S3 => {
            let region = config.region.clone().ok_or_else(|| {
                StorageError::ConfigError("S3_REGION or AWS_REGION not configured".to_string())
            })?;
            let build = |bucket: &str| -> StorageResult<Arc<dyn ObjectStorage>> {
                let storage =
                    S3Storage::new(bucket.to_string(), region.clone(), config.endpoint.clone())?;
                Ok(Arc::new(storage))
            };

            let uploads = build(&config.uploads_bucket)?;
            let resized = if shared {
                uploads.clone()
            } else {
                build(&config.resized_bucket)?
            };
            tracing::info!(
                uploads_bucket = %config.uploads_bucket,
                resized_bucket = %config.resized_bucket,
                "S3 storage configured"
            );
            Ok(StorageSet::new(uploads, resized))
        }

        #[cfg(not(feature = "storage-s3"))]
        StorageBackend::S3 => Err(StorageError::ConfigError(
            "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-memory")]
        StorageBackend::Memory => {
            let uploads: Arc<dyn ObjectStorage> =
                Arc::new(MemoryStorage::new(config.uploads_bucket.clone()));
            let resized: Arc<dyn ObjectStorage> = if shared {
                uploads.clone()
            } else {
                Arc::new(MemoryStorage::new(config.resized_bucket.clone()))
            };
            tracing::warn!("Using in-memory storage; objects are lost on exit");
            Ok(StorageSet::new(uploads, resized))
        }

        #[cfg(not(feature = "storage-memory"))]
        StorageBackend::Memory => Err(StorageError::ConfigError(
            "Memory storage backend not available (storage-memory feature not enabled)"
                .to_string(),
        )),
    }
}
