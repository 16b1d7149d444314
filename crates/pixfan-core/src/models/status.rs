use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Processing,
    Complete,
}

impl ProcessingStatus {
    pub fn message(self) -> &'static str {
        match self {
            ProcessingStatus::Processing => "Images are still being processed",
            ProcessingStatus::Complete => "Images are ready",
        }
    }
}

/// One derived object as reported to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedImage {
    pub key: String,
    pub download_url: String,
    pub width: u32,
    pub height: u32,
    /// Object size in bytes.
    pub size: u64,
}

/// Aggregated view of the derivatives of one source object.
///
/// `images` is always sorted by ascending width.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    #[serde(default)]
    pub original_key: String,
    pub status: ProcessingStatus,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub images: Vec<DerivedImage>,
    #[serde(default)]
    pub cdn: bool,
}

impl StatusReport {
    pub fn new(
        original_key: impl Into<String>,
        status: ProcessingStatus,
        mut images: Vec<DerivedImage>,
        cdn: bool,
    ) -> Self {
        images.sort_by(|a, b| {
            a.width
                .cmp(&b.width)
                .then(a.height.cmp(&b.height))
                .then_with(|| a.key.cmp(&b.key))
        });
        images.dedup_by(|a, b| a.key == b.key);
        Self {
            original_key: original_key.into(),
            status,
            message: status.message().to_string(),
            images,
            cdn,
        }
    }

    /// Nothing derived yet.
    pub fn processing(original_key: impl Into<String>, cdn: bool) -> Self {
        Self::new(original_key, ProcessingStatus::Processing, Vec::new(), cdn)
    }

    pub fn is_complete(&self) -> bool {
        self.status == ProcessingStatus::Complete
    }
}
