use serde::{Deserialize, Serialize};

/// Body of an upload grant request: `{filename, contentType}`.
///
/// Both fields are optional on the wire; the broker rejects a missing
/// filename and defaults the content type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// Write credential bound to a freshly minted source key.
///
/// Serializes to the wire shape `{uploadUrl, key, expiresIn}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadGrant {
    pub key: String,
    #[serde(rename = "uploadUrl")]
    pub write_url: String,
    /// Seconds until the object store rejects the write URL.
    pub expires_in: u64,
}

/// Read access to one object.
///
/// Serializes to the wire shape `{downloadUrl, expiresIn, cdn}`. A CDN URL
/// never expires, so `expires_in` is `None` (`null`) in that case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadGrant {
    #[serde(rename = "downloadUrl")]
    pub url: String,
    pub expires_in: Option<u64>,
    pub cdn: bool,
}
