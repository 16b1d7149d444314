use pixfan_core::{DownloadGrant, GrantConfig, PipelineError};
use pixfan_storage::ObjectStorage;
use std::sync::Arc;
use std::time::Duration;

/// Read access to derived objects.
///
/// With a CDN domain configured every grant is a permanent CDN URL;
/// otherwise it is a presigned GET against the derived bucket.
#[derive(Clone)]
pub struct DownloadGrants {
    storage: Arc<dyn ObjectStorage>,
    cdn_domain: Option<String>,
    ttl: Duration,
}

impl DownloadGrants {
    pub fn new(storage: Arc<dyn ObjectStorage>, config: &GrantConfig) -> Self {
        Self {
            storage,
            cdn_domain: config.cdn_domain.clone(),
            ttl: config.download_ttl,
        }
    }

    pub fn is_cdn(&self) -> bool {
        self.cdn_domain.is_some()
    }

    pub async fn grant(&self, key: &str) -> Result<DownloadGrant, PipelineError> {
        if key.is_empty() {
            return Err(PipelineError::InvalidRequest("key is required".to_string()));
        }

        match self.cdn_domain {
            Some(ref domain) => Ok(DownloadGrant {
                url: format!("https://{}/{}", domain, key),
                expires_in: None,
                cdn: true,
            }),
            None => {
                let url = self.storage.presigned_get_url(key, self.ttl).await?;
                Ok(DownloadGrant {
                    url,
                    expires_in: Some(self.ttl.as_secs()),
                    cdn: false,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixfan_storage::MemoryStorage;

    fn grants(cdn_domain: Option<&str>) -> DownloadGrants {
        let config = GrantConfig {
            cdn_domain: cdn_domain.map(str::to_string),
            ..GrantConfig::default()
        };
        DownloadGrants::new(Arc::new(MemoryStorage::new("resized")), &config)
    }

    #[tokio::test]
    async fn test_cdn_grant_never_expires() {
        let grant = grants(Some("d111.cloudfront.net"))
            .grant("resized/cat_320x240.jpg")
            .await
            .unwrap();
        assert_eq!(grant.url, "https://d111.cloudfront.net/resized/cat_320x240.jpg");
        assert_eq!(grant.expires_in, None);
        assert!(grant.cdn);
    }

    #[tokio::test]
    async fn test_signed_grant_uses_download_ttl() {
        let grant = grants(None)
            .grant("resized/cat_320x240.jpg")
            .await
            .unwrap();
        assert_eq!(
            grant.url,
            "memory://resized/resized/cat_320x240.jpg?X-Method=GET&X-Expires=3600"
        );
        assert_eq!(grant.expires_in, Some(3600));
        assert!(!grant.cdn);
    }

    #[tokio::test]
    async fn test_empty_key_is_invalid() {
        for cdn in [None, Some("cdn.example.com")] {
            let result = grants(cdn).grant("").await;
            assert!(matches!(result, Err(PipelineError::InvalidRequest(_))));
        }
    }
}
