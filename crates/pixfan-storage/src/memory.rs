//! In-memory object storage.
//!
//! Used as the test double for the pipeline and for local runs without S3.
//! Presigned URLs use a `memory://` scheme and carry the expiry as a query
//! parameter; nothing enforces it.

use crate::traits::{
    validate_key, ObjectInfo, ObjectStorage, StorageError, StorageResult, StoredObject,
};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

#[derive(Debug, Clone)]
struct MemoryObject {
    data: Bytes,
    content_type: String,
    metadata: BTreeMap<String, String>,
}

#[derive(Default)]
struct FailureInjection {
    put_keys: HashSet<String>,
    get_keys: HashSet<String>,
    list: bool,
}

/// In-memory storage bound to one bucket.
///
/// Clones share the same objects.
#[derive(Clone)]
pub struct MemoryStorage {
    bucket: String,
    objects: Arc<RwLock<BTreeMap<String, MemoryObject>>>,
    put_count: Arc<Mutex<usize>>,
    failures: Arc<Mutex<FailureInjection>>,
}

impl MemoryStorage {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: Arc::new(RwLock::new(BTreeMap::new())),
            put_count: Arc::new(Mutex::new(0)),
            failures: Arc::new(Mutex::new(FailureInjection::default())),
        }
    }

    /// Keys currently stored, ascending.
    pub fn keys(&self) -> Vec<String> {
        self.objects
            .read()
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Raw bytes of `key`, if present.
    pub fn object_bytes(&self, key: &str) -> Option<Bytes> {
        self.objects
            .read()
            .ok()
            .and_then(|objects| objects.get(key).map(|o| o.data.clone()))
    }

    /// Number of successful puts since creation, overwrites included.
    pub fn put_count(&self) -> usize {
        self.put_count.lock().map(|count| *count).unwrap_or(0)
    }

    /// Make every subsequent put to `key` fail until cleared.
    pub fn fail_puts_to(&self, key: impl Into<String>) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.put_keys.insert(key.into());
        }
    }

    /// Make every subsequent get of `key` fail until cleared.
    pub fn fail_gets_of(&self, key: impl Into<String>) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.get_keys.insert(key.into());
        }
    }

    pub fn fail_lists(&self, fail: bool) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.list = fail;
        }
    }

    pub fn clear_failures(&self) {
        if let Ok(mut failures) = self.failures.lock() {
            *failures = FailureInjection::default();
        }
    }

    fn injected<F: Fn(&FailureInjection) -> bool>(&self, check: F) -> bool {
        self.failures.lock().map(|f| check(&f)).unwrap_or(false)
    }

    fn poisoned() -> StorageError {
        StorageError::BackendError("memory storage lock poisoned".to_string())
    }

    fn signed_url(&self, method: &str, key: &str, expires_in: Duration) -> String {
        format!(
            "memory://{}/{}?X-Method={}&X-Expires={}",
            self.bucket,
            key,
            method,
            expires_in.as_secs()
        )
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn get(&self, key: &str) -> StorageResult<StoredObject> {
        validate_key(key)?;
        if self.injected(|f| f.get_keys.contains(key)) {
            return Err(StorageError::DownloadFailed(format!(
                "injected failure reading {}",
                key
            )));
        }
        let objects = self.objects.read().map_err(|_| Self::poisoned())?;
        let object = objects
            .get(key)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;

        Ok(StoredObject {
            data: object.data.clone(),
            content_type: Some(object.content_type.clone()),
            metadata: object.metadata.clone(),
        })
    }

    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
        metadata: &BTreeMap<String, String>,
    ) -> StorageResult<()> {
        validate_key(key)?;
        if self.injected(|f| f.put_keys.contains(key)) {
            return Err(StorageError::UploadFailed(format!(
                "injected failure writing {}",
                key
            )));
        }
        let size = data.len();
        {
            let mut objects = self.objects.write().map_err(|_| Self::poisoned())?;
            objects.insert(
                key.to_string(),
                MemoryObject {
                    data,
                    content_type: content_type.to_string(),
                    metadata: metadata.clone(),
                },
            );
        }
        if let Ok(mut count) = self.put_count.lock() {
            *count += 1;
        }

        tracing::debug!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            "Memory storage put successful"
        );
        Ok(())
    }

    async fn list_prefix(&self, prefix: &str) -> StorageResult<Vec<ObjectInfo>> {
        if self.injected(|f| f.list) {
            return Err(StorageError::ListFailed(format!(
                "injected failure listing {}",
                prefix
            )));
        }
        let objects = self.objects.read().map_err(|_| Self::poisoned())?;
        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, object)| ObjectInfo {
                key: key.clone(),
                size: object.data.len() as u64,
            })
            .collect())
    }

    async fn presigned_get_url(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        validate_key(key)?;
        Ok(self.signed_url("GET", key, expires_in))
    }

    async fn presigned_put_url(
        &self,
        key: &str,
        _content_type: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        validate_key(key)?;
        Ok(self.signed_url("PUT", key, expires_in))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}
