use crate::traits::{
    validate_key, ObjectInfo, ObjectStorage, StorageError, StorageResult, StoredObject,
};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use http::Method;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, AttributeValue, Attributes, ObjectStore, ObjectStoreExt, PutOptions, PutPayload,
    Result as ObjectResult,
};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::time::Duration;

/// S3 storage implementation bound to one bucket
#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    pub fn new(bucket: String, region: String, endpoint_url: Option<String>) -> StorageResult<Self> {
        // Credentials come from the environment (AWS_ACCESS_KEY_ID, etc.)
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region)
            .with_bucket_name(bucket.clone());

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http)
                .with_virtual_hosted_style_request(false);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3Storage { store, bucket })
    }

    /// Directory part of a string prefix: `resized/1-cat_` -> `resized`.
    ///
    /// object_store lists by path segment, so the listing is done on the
    /// directory and narrowed to the string prefix afterwards.
    fn listing_dir(prefix: &str) -> Option<Path> {
        prefix
            .rfind('/')
            .filter(|&idx| idx > 0)
            .map(|idx| Path::from(&prefix[..idx]))
    }

    /// Listing start point for `prefix`: the prefix without its last
    /// character. S3 starts strictly after the offset, so keys equal to the
    /// prefix are still returned.
    fn listing_offset(prefix: &str) -> Option<Path> {
        let (idx, _) = prefix.char_indices().last()?;
        let offset = &prefix[..idx];
        if offset.is_empty() {
            None
        } else {
            Some(Path::from(offset))
        }
    }

    /// Keys arrive in ascending order, so the first key sorting after
    /// `prefix` without starting with it ends the matching range.
    fn past_prefix(key: &str, prefix: &str) -> bool {
        !key.starts_with(prefix) && key > prefix
    }

    fn split_attributes(attributes: &Attributes) -> (Option<String>, BTreeMap<String, String>) {
        let mut content_type = None;
        let mut metadata = BTreeMap::new();
        for (attribute, value) in attributes.iter() {
            let value: &str = value.as_ref();
            match attribute {
                Attribute::ContentType => content_type = Some(value.to_string()),
                Attribute::Metadata(name) => {
                    metadata.insert(name.to_string(), value.to_string());
                }
                _ => {}
            }
        }
        (content_type, metadata)
    }

    async fn sign(&self, method: Method, key: &str, expires_in: Duration) -> StorageResult<String> {
        validate_key(key)?;
        let location = Path::from(key);
        let url_result: ObjectResult<_> = self.store.signed_url(method, &location, expires_in).await;

        let url = url_result
            .map_err(|e| StorageError::SigningFailed(e.to_string()))?
            .to_string();

        Ok(url)
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn get(&self, key: &str) -> StorageResult<StoredObject> {
        validate_key(key)?;
        let start = std::time::Instant::now();
        let location = Path::from(key);

        let result: ObjectResult<_> = self.store.get(&location).await;

        let result = result.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(key.to_string()),
            other => {
                tracing::error!(
                    error = %other,
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 get failed"
                );
                StorageError::DownloadFailed(other.to_string())
            }
        })?;

        let (content_type, metadata) = Self::split_attributes(&result.attributes);
        let data = result
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = data.len() as u64,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 get successful"
        );

        Ok(StoredObject {
            data,
            content_type,
            metadata,
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
        let size = data.len() as u64;
        let location = Path::from(key);
        let start = std::time::Instant::now();

        let mut attributes = Attributes::new();
        attributes.insert(
            Attribute::ContentType,
            AttributeValue::from(content_type.to_string()),
        );
        for (name, value) in metadata {
            attributes.insert(
                Attribute::Metadata(Cow::Owned(name.clone())),
                AttributeValue::from(value.clone()),
            );
        }
        let options = PutOptions {
            attributes,
            ..Default::default()
        };

        let result: ObjectResult<_> = self
            .store
            .put_opts(&location, PutPayload::from(data), options)
            .await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 put failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 put successful"
        );

        Ok(())
    }

    async fn list_prefix(&self, prefix: &str) -> StorageResult<Vec<ObjectInfo>> {
        let start = std::time::Instant::now();
        let dir = Self::listing_dir(prefix);
        let mut stream = match Self::listing_offset(prefix) {
            Some(offset) => self.store.list_with_offset(dir.as_ref(), &offset),
            None => self.store.list(dir.as_ref()),
        };

        let mut objects = Vec::new();
        while let Some(entry) = stream.next().await {
            let meta = entry.map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    prefix = %prefix,
                    "S3 list failed"
                );
                StorageError::ListFailed(e.to_string())
            })?;
            let key = meta.location.to_string();
            if Self::past_prefix(&key, prefix) {
                break;
            }
            if key.starts_with(prefix) {
                objects.push(ObjectInfo {
                    key,
                    size: meta.size as u64,
                });
            }
        }
        objects.sort_by(|a, b| a.key.cmp(&b.key));

        tracing::debug!(
            bucket = %self.bucket,
            prefix = %prefix,
            count = objects.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 list successful"
        );

        Ok(objects)
    }

    async fn presigned_get_url(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        self.sign(Method::GET, key, expires_in).await
    }

    async fn presigned_put_url(
        &self,
        key: &str,
        _content_type: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        self.sign(Method::PUT, key, expires_in).await
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_dir() {
        assert_eq!(
            S3Storage::listing_dir("resized/1-cat_").map(|p| p.to_string()),
            Some("resized".to_string())
        );
        assert_eq!(S3Storage::listing_dir("resized").map(|p| p.to_string()), None);
        assert_eq!(
            S3Storage::listing_dir("a/b/c_").map(|p| p.to_string()),
            Some("a/b".to_string())
        );
    }

    #[test]
    fn test_listing_offset_precedes_prefix() {
        assert_eq!(
            S3Storage::listing_offset("resized/1-cat_").map(|p| p.to_string()),
            Some("resized/1-cat".to_string())
        );
        assert_eq!(S3Storage::listing_offset("r").map(|p| p.to_string()), None);
        assert_eq!(S3Storage::listing_offset("").map(|p| p.to_string()), None);
    }

    #[test]
    fn test_past_prefix_stops_after_matching_range() {
        let prefix = "resized/1-cat_";
        // Sorts between the offset and the prefix: skipped, not a stop.
        assert!(!S3Storage::past_prefix("resized/1-cat-2_150x113.jpg", prefix));
        assert!(!S3Storage::past_prefix("resized/1-cat_150x113.jpg", prefix));
        assert!(!S3Storage::past_prefix("resized/1-cat_2_150x113.jpg", prefix));
        assert!(S3Storage::past_prefix("resized/1-catalog_150x113.jpg", prefix));
        assert!(S3Storage::past_prefix("resized/2-dog_150x113.jpg", prefix));
    }

    #[test]
    fn test_split_attributes() {
        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, AttributeValue::from("image/jpeg"));
        attributes.insert(
            Attribute::Metadata(Cow::Borrowed("original-width")),
            AttributeValue::from("800"),
        );
        attributes.insert(Attribute::CacheControl, AttributeValue::from("max-age=60"));

        let (content_type, metadata) = S3Storage::split_attributes(&attributes);
        assert_eq!(content_type.as_deref(), Some("image/jpeg"));
        assert_eq!(metadata.len(), 1);
        assert_eq!(metadata["original-width"], "800");
    }
}
