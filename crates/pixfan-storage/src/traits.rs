//! Storage abstraction trait
//!
//! This module defines the ObjectStorage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use pixfan_core::PipelineError;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("List failed: {0}")]
    ListFailed(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for PipelineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidKey(msg) => PipelineError::InvalidRequest(msg),
            StorageError::ConfigError(msg) => PipelineError::Configuration(msg),
            other => PipelineError::UpstreamStorage(other.to_string()),
        }
    }
}

/// Entry returned by a prefix listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
}

/// A fetched object with the attributes stored alongside it.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Bytes,
    pub content_type: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

/// Storage abstraction trait
///
/// One instance addresses one bucket. Implementations must make `put`
/// atomic per key (readers see either the old or the new object, never a
/// mix); the pipeline relies on that instead of locks.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Bucket (or container) this instance addresses.
    fn bucket(&self) -> &str;

    /// Fetch the full object.
    async fn get(&self, key: &str) -> StorageResult<StoredObject>;

    /// Create or overwrite `key`.
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
        metadata: &BTreeMap<String, String>,
    ) -> StorageResult<()>;

    /// Every object whose key starts with `prefix` (plain string prefix, not
    /// a directory), in ascending key order.
    async fn list_prefix(&self, prefix: &str) -> StorageResult<Vec<ObjectInfo>>;

    /// Generate a presigned/temporary URL for direct access (GET)
    async fn presigned_get_url(&self, key: &str, expires_in: Duration) -> StorageResult<String>;

    /// Generate a presigned PUT URL for direct uploads.
    ///
    /// Expiry is enforced by the store, not by the caller.
    async fn presigned_put_url(
        &self,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}

/// Reject keys that cannot name an object.
pub(crate) fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("key must not be empty".to_string()));
    }
    if key.starts_with('/') || key.split('/').any(|part| part == "..") {
        return Err(StorageError::InvalidKey(format!(
            "key contains invalid path segments: {}",
            key
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("uploads/1-cat.jpg").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("/uploads/x").is_err());
        assert!(validate_key("uploads/../secret").is_err());
    }

    #[test]
    fn test_storage_error_conversion() {
        let err: PipelineError = StorageError::NotFound("uploads/x".to_string()).into();
        assert!(matches!(err, PipelineError::UpstreamStorage(_)));

        let err: PipelineError = StorageError::InvalidKey("bad".to_string()).into();
        assert!(matches!(err, PipelineError::InvalidRequest(_)));
    }
}
