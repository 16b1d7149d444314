use std::collections::BTreeMap;

use crate::constants::{META_ORIGINAL_HEIGHT, META_ORIGINAL_KEY, META_ORIGINAL_WIDTH};

/// Link from a derived object back to its source, stored as object metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub original_key: String,
    pub original_width: u32,
    pub original_height: u32,
}

impl Provenance {
    pub fn to_metadata(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (META_ORIGINAL_KEY.to_string(), self.original_key.clone()),
            (
                META_ORIGINAL_WIDTH.to_string(),
                self.original_width.to_string(),
            ),
            (
                META_ORIGINAL_HEIGHT.to_string(),
                self.original_height.to_string(),
            ),
        ])
    }

    /// Read provenance back from object metadata. Returns `None` if any entry
    /// is missing or not a number.
    pub fn from_metadata(metadata: &BTreeMap<String, String>) -> Option<Self> {
        Some(Self {
            original_key: metadata.get(META_ORIGINAL_KEY)?.clone(),
            original_width: metadata.get(META_ORIGINAL_WIDTH)?.parse().ok()?,
            original_height: metadata.get(META_ORIGINAL_HEIGHT)?.parse().ok()?,
        })
    }
}
