use crate::download::DownloadGrants;
use async_trait::async_trait;
use futures::future::try_join_all;
use pixfan_core::naming::{basename, derived_prefix, parse_derived_key, DerivedName};
use pixfan_core::{
    CompletionPolicy, DerivedImage, PipelineConfig, PipelineError, ProcessingStatus, StatusReport,
    StatusSource, TargetWidths,
};
use pixfan_storage::{ObjectInfo, ObjectStorage, StorageSet};
use std::sync::Arc;

/// Answers "which derivatives of this source exist yet?".
///
/// The answer comes from a prefix listing of the derived namespace; key names
/// are the only source of width and height, so every listed key goes through
/// the strict parser and non-conforming names are dropped.
#[derive(Clone)]
pub struct StatusResolver {
    resized: Arc<dyn ObjectStorage>,
    downloads: DownloadGrants,
    targets: TargetWidths,
    policy: CompletionPolicy,
}

impl StatusResolver {
    pub fn new(storage: &StorageSet, config: &PipelineConfig) -> Self {
        Self {
            resized: storage.resized.clone(),
            downloads: DownloadGrants::new(storage.resized.clone(), &config.grants),
            targets: config.targets.clone(),
            policy: config.completion_policy,
        }
    }

    pub fn with_policy(mut self, policy: CompletionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> CompletionPolicy {
        self.policy
    }

    #[tracing::instrument(skip(self), fields(policy = ?self.policy))]
    pub async fn get_status(&self, original_key: &str) -> Result<StatusReport, PipelineError> {
        if original_key.is_empty() {
            return Err(PipelineError::InvalidRequest("key is required".to_string()));
        }

        let basename = basename(original_key);
        let prefix = derived_prefix(basename);
        let listed = self.resized.list_prefix(&prefix).await?;

        let parsed: Vec<(ObjectInfo, DerivedName)> = listed
            .into_iter()
            .filter_map(|object| match parse_derived_key(&object.key, basename) {
                Ok(name) => Some((object, name)),
                Err(e) => {
                    tracing::warn!(
                        bucket = %self.resized.bucket(),
                        key = %object.key,
                        error = %e,
                        "Ignoring derived object with malformed name"
                    );
                    None
                }
            })
            .collect();

        if parsed.is_empty() {
            tracing::debug!(prefix = %prefix, "No derived objects yet");
            return Ok(StatusReport::processing(original_key, self.downloads.is_cdn()));
        }

        let images = try_join_all(parsed.iter().map(|(object, name)| async move {
            let grant = self.downloads.grant(&object.key).await?;
            Ok::<_, PipelineError>(DerivedImage {
                key: object.key.clone(),
                download_url: grant.url,
                width: name.width,
                height: name.height,
                size: object.size,
            })
        }))
        .await?;

        let status = self.completion_status(&images);
        tracing::debug!(
            prefix = %prefix,
            found = images.len(),
            expected = self.targets.len(),
            status = ?status,
            "Resolved derivation status"
        );

        Ok(StatusReport::new(
            original_key,
            status,
            images,
            self.downloads.is_cdn(),
        ))
    }

    fn completion_status(&self, images: &[DerivedImage]) -> ProcessingStatus {
        let complete = match self.policy {
            CompletionPolicy::RequireAny => !images.is_empty(),
            CompletionPolicy::RequireAll => self
                .targets
                .as_slice()
                .iter()
                .all(|width| images.iter().any(|image| image.width == *width)),
        };
        if complete {
            ProcessingStatus::Complete
        } else {
            ProcessingStatus::Processing
        }
    }
}

#[async_trait]
impl StatusSource for StatusResolver {
    async fn status(&self, original_key: &str) -> Result<StatusReport, PipelineError> {
        self.get_status(original_key).await
    }
}
