//! Domain methods: upload grants, direct upload, status and download grants.

use crate::poller::Poller;
use crate::{ensure_success, transport, ApiClient};
use anyhow::{Context, Result};
use bytes::Bytes;
use pixfan_core::{
    DerivedImage, DownloadGrant, PipelineError, PollerConfig, StatusReport, UploadGrant,
    UploadRequest,
};
use reqwest::header::CONTENT_TYPE;
use tokio_util::sync::CancellationToken;

/// Path segment for an object key; `/` inside the key is escaped.
pub fn key_path(prefix: &str, key: &str) -> String {
    format!("{}/{}", prefix, urlencoding::encode(key))
}

impl ApiClient {
    /// `POST /presign/upload`
    pub async fn request_upload_grant(
        &self,
        filename: &str,
        content_type: Option<&str>,
    ) -> Result<UploadGrant, PipelineError> {
        let request = UploadRequest {
            filename: Some(filename.to_string()),
            content_type: content_type.map(str::to_string),
        };
        self.post_json("/presign/upload", &request).await
    }

    /// `PUT {uploadUrl}` straight to the object store.
    pub async fn put_upload(
        &self,
        grant: &UploadGrant,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), PipelineError> {
        let size = data.len();
        let response = self
            .http()
            .put(&grant.write_url)
            .header(CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await
            .map_err(|e| transport("Failed to upload to object store", e))?;
        ensure_success(response).await?;

        tracing::info!(key = %grant.key, size_bytes = size, "Uploaded source image");
        Ok(())
    }

    /// `GET /status/{key}`
    pub async fn get_status(&self, original_key: &str) -> Result<StatusReport, PipelineError> {
        if original_key.is_empty() {
            return Err(PipelineError::InvalidRequest("key is required".to_string()));
        }
        self.get(&key_path("/status", original_key)).await
    }

    /// `GET /presign/download/{key}`
    pub async fn get_download_grant(&self, key: &str) -> Result<DownloadGrant, PipelineError> {
        if key.is_empty() {
            return Err(PipelineError::InvalidRequest("key is required".to_string()));
        }
        self.get(&key_path("/presign/download", key)).await
    }

    /// Request a grant, upload `data`, and poll until every derivative is
    /// ready.
    pub async fn upload_and_wait(
        &self,
        filename: &str,
        content_type: &str,
        data: Bytes,
        poller: &PollerConfig,
        cancel: &CancellationToken,
    ) -> Result<Vec<DerivedImage>> {
        let grant = self
            .request_upload_grant(filename, Some(content_type))
            .await
            .context("Failed to get upload URL")?;
        self.put_upload(&grant, data, content_type)
            .await
            .context("Failed to upload image")?;

        let images = Poller::new(self.clone(), poller.clone())
            .wait_for_images(&grant.key, cancel)
            .await
            .with_context(|| format!("Failed waiting for derivatives of {}", grant.key))?;
        Ok(images)
    }
}
