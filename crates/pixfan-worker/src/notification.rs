//! S3 event notifications.
//!
//! Only the fields the worker needs are modelled. Test events sent by S3
//! when a notification is configured carry no `Records` and parse as an
//! empty batch.

use pixfan_core::PipelineError;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct S3Event {
    #[serde(rename = "Records", default)]
    pub records: Vec<S3EventRecord>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3EventRecord {
    #[serde(default)]
    pub event_name: String,
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Bucket {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Object {
    /// URL-encoded, with spaces as `+`.
    pub key: String,
    #[serde(default)]
    pub size: Option<u64>,
}

/// A source object named by one notification record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    pub bucket: String,
    pub key: String,
    pub size: Option<u64>,
}

impl S3Event {
    pub fn parse(body: &str) -> Result<Self, PipelineError> {
        Ok(serde_json::from_str(body)?)
    }
}

impl S3EventRecord {
    /// Whether this record reports a new object. Records without an event
    /// name are treated as creations.
    pub fn is_object_created(&self) -> bool {
        self.event_name.is_empty() || self.event_name.starts_with("ObjectCreated")
    }

    pub fn source(&self) -> Result<SourceRecord, PipelineError> {
        Ok(SourceRecord {
            bucket: self.s3.bucket.name.clone(),
            key: decode_object_key(&self.s3.object.key)?,
            size: self.s3.object.size,
        })
    }
}

/// Decode a key as S3 writes it into notifications: `+` stands for a space,
/// everything else is percent-encoded.
pub fn decode_object_key(raw: &str) -> Result<String, PipelineError> {
    let spaced = raw.replace('+', " ");
    let decoded = urlencoding::decode(&spaced).map_err(|e| {
        PipelineError::InvalidRequest(format!("undecodable object key {}: {}", raw, e))
    })?;
    if decoded.is_empty() {
        return Err(PipelineError::InvalidRequest(
            "notification record has an empty object key".to_string(),
        ));
    }
    Ok(decoded.into_owned())
}
