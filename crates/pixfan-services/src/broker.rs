use crate::download::DownloadGrants;
use chrono::Utc;
use pixfan_core::constants::DEFAULT_CONTENT_TYPE;
use pixfan_core::naming::upload_key;
use pixfan_core::{DownloadGrant, GrantConfig, PipelineError, UploadGrant};
use pixfan_storage::{ObjectStorage, StorageSet};
use std::sync::Arc;
use std::time::Duration;

/// Issues short-lived write grants for new source objects, and read grants
/// for derived objects.
///
/// The broker never touches object contents. Expiry of the write URL is
/// enforced by the object store; the broker only declares it.
#[derive(Clone)]
pub struct UploadBroker {
    uploads: Arc<dyn ObjectStorage>,
    downloads: DownloadGrants,
    upload_ttl: Duration,
}

impl UploadBroker {
    pub fn new(storage: &StorageSet, grants: &GrantConfig) -> Self {
        Self {
            uploads: storage.uploads.clone(),
            downloads: DownloadGrants::new(storage.resized.clone(), grants),
            upload_ttl: grants.upload_ttl,
        }
    }

    /// Mint a source key for `filename` and sign a PUT URL for it.
    #[tracing::instrument(skip(self), fields(grant.operation = "upload"))]
    pub async fn issue_upload_grant(
        &self,
        filename: Option<&str>,
        content_type: Option<&str>,
    ) -> Result<UploadGrant, PipelineError> {
        let filename = filename
            .ok_or_else(|| PipelineError::InvalidRequest("filename is required".to_string()))?;
        let content_type = content_type
            .map(str::trim)
            .filter(|ct| !ct.is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE);

        let key = upload_key(Utc::now().timestamp_millis(), filename)?;
        let write_url = self
            .uploads
            .presigned_put_url(&key, content_type, self.upload_ttl)
            .await?;

        tracing::info!(
            bucket = %self.uploads.bucket(),
            key = %key,
            content_type = %content_type,
            expires_in = self.upload_ttl.as_secs(),
            "Issued upload grant"
        );

        Ok(UploadGrant {
            key,
            write_url,
            expires_in: self.upload_ttl.as_secs(),
        })
    }

    #[tracing::instrument(skip(self), fields(grant.operation = "download"))]
    pub async fn issue_download_grant(&self, key: &str) -> Result<DownloadGrant, PipelineError> {
        self.downloads.grant(key).await
    }
}
