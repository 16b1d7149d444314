//! Object key naming convention.
//!
//! Source key: `uploads/{millis}-{filename}`.
//! Derived key: `resized/{basename}_{width}x{height}.{ext}`, where `basename`
//! is the source key without its directory and extension.
//!
//! The resize worker builds keys with [`derived_key`]; the status resolver
//! lists [`derived_prefix`] and reads dimensions back with
//! [`parse_derived_key`]. Both sides must use this module.

use crate::constants::{RESIZED_PREFIX, UPLOADS_PREFIX};
use crate::error::PipelineError;

/// Dimensions and extension recovered from a derived key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedName {
    pub width: u32,
    pub height: u32,
    pub extension: String,
}

/// Reduce a client supplied filename to a single key segment.
///
/// Directory components (both `/` and `\`) and control characters are
/// removed and surrounding whitespace trimmed. Returns `None` when nothing
/// usable remains.
pub fn sanitize_filename(raw: &str) -> Option<String> {
    let last_segment = raw.rsplit(&['/', '\\'][..]).next().unwrap_or(raw);
    let cleaned: String = last_segment.chars().filter(|c| !c.is_control()).collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        return None;
    }
    Some(cleaned.to_string())
}

/// Build the key an upload grant is bound to.
///
/// Two callers in the same millisecond only collide when they also send the
/// same filename.
pub fn upload_key(timestamp_millis: i64, filename: &str) -> Result<String, PipelineError> {
    let filename = sanitize_filename(filename)
        .ok_or_else(|| PipelineError::InvalidRequest("filename is required".to_string()))?;
    Ok(format!("{}{}-{}", UPLOADS_PREFIX, timestamp_millis, filename))
}

/// Source key without directory and extension: `uploads/123-cat.jpg` -> `123-cat`.
pub fn basename(key: &str) -> &str {
    let file = key.rsplit('/').next().unwrap_or(key);
    match file.rfind('.') {
        Some(idx) if idx + 1 < file.len() => &file[..idx],
        _ => file,
    }
}

/// Listing prefix for every derivative of `basename`.
pub fn derived_prefix(basename: &str) -> String {
    format!("{}{}_", RESIZED_PREFIX, basename)
}

pub fn derived_key(basename: &str, width: u32, height: u32, extension: &str) -> String {
    format!(
        "{}{}x{}.{}",
        derived_prefix(basename),
        width,
        height,
        extension
    )
}

/// Whether `key` lives in the derived namespace.
pub fn is_derived_key(key: &str) -> bool {
    key.starts_with(RESIZED_PREFIX)
}

fn parse_dimension(digits: &str, key: &str) -> Result<u32, PipelineError> {
    let malformed = || PipelineError::MalformedDerivedName(key.to_string());
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    match digits.parse::<u32>() {
        Ok(0) | Err(_) => Err(malformed()),
        Ok(value) => Ok(value),
    }
}

/// Parse `{width}x{height}.{ext}` exactly, with nothing before or after.
///
/// Widths and heights are positive decimal integers; the extension is one or
/// more ASCII alphanumerics.
pub fn parse_dimension_suffix(suffix: &str) -> Result<DerivedName, PipelineError> {
    let malformed = || PipelineError::MalformedDerivedName(suffix.to_string());

    let (dims, extension) = suffix.split_once('.').ok_or_else(malformed)?;
    if extension.is_empty() || !extension.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(malformed());
    }
    let (width, height) = dims.split_once('x').ok_or_else(malformed)?;

    Ok(DerivedName {
        width: parse_dimension(width, suffix)?,
        height: parse_dimension(height, suffix)?,
        extension: extension.to_string(),
    })
}

/// Parse a listed key belonging to `basename`.
///
/// Fails closed: any key that is not exactly
/// `resized/{basename}_{width}x{height}.{ext}` is `MalformedDerivedName`.
/// This also rejects derivatives of a longer basename sharing the prefix
/// (`resized/123-cat_2_150x113.jpg` does not belong to `123-cat`).
pub fn parse_derived_key(key: &str, basename: &str) -> Result<DerivedName, PipelineError> {
    let prefix = derived_prefix(basename);
    let suffix = key
        .strip_prefix(prefix.as_str())
        .ok_or_else(|| PipelineError::MalformedDerivedName(key.to_string()))?;
    parse_dimension_suffix(suffix).map_err(|_| PipelineError::MalformedDerivedName(key.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_key_format() {
        let key = upload_key(1700000000123, "cat.jpg").unwrap();
        assert_eq!(key, "uploads/1700000000123-cat.jpg");
    }

    #[test]
    fn test_upload_key_rejects_empty() {
        assert!(matches!(
            upload_key(1, ""),
            Err(PipelineError::InvalidRequest(_))
        ));
        assert!(upload_key(1, "   ").is_err());
        assert!(upload_key(1, "dir/").is_err());
        assert!(upload_key(1, "..").is_err());
    }

    #[test]
    fn test_sanitize_strips_directories_and_controls() {
        assert_eq!(sanitize_filename("../../etc/passwd").unwrap(), "passwd");
        assert_eq!(sanitize_filename("C:\\photos\\cat.jpg").unwrap(), "cat.jpg");
        assert_eq!(sanitize_filename("ca\nt.jpg").unwrap(), "cat.jpg");
        assert_eq!(sanitize_filename(" my cat.jpg ").unwrap(), "my cat.jpg");
    }

    #[test]
    fn test_basename() {
        assert_eq!(basename("uploads/123-cat.jpg"), "123-cat");
        assert_eq!(basename("cat.jpg"), "cat");
        assert_eq!(basename("uploads/archive.tar.gz"), "archive.tar");
        assert_eq!(basename("uploads/noext"), "noext");
        assert_eq!(basename("uploads/trailing."), "trailing.");
        assert_eq!(basename("a.b/c"), "c");
    }

    #[test]
    fn test_derived_key_is_pure() {
        assert_eq!(derived_key("cat", 150, 113, "jpg"), "resized/cat_150x113.jpg");
        assert_eq!(
            derived_key("cat", 150, 113, "jpg"),
            derived_key("cat", 150, 113, "jpg")
        );
    }

    #[test]
    fn test_parse_derived_key_roundtrip_with_worker_naming() {
        let key = derived_key("123-cat", 320, 240, "jpg");
        let parsed = parse_derived_key(&key, "123-cat").unwrap();
        assert_eq!(
            parsed,
            DerivedName {
                width: 320,
                height: 240,
                extension: "jpg".to_string()
            }
        );
    }

    #[test]
    fn test_parse_rejects_non_conforming_names() {
        let bad = [
            "resized/cat_x240.jpg",
            "resized/cat_320x.jpg",
            "resized/cat_320x240",
            "resized/cat_320x240.",
            "resized/cat_320X240.jpg",
            "resized/cat_0x240.jpg",
            "resized/cat_320x240.jpg.bak",
            "resized/cat_+320x240.jpg",
            "resized/cat_320x240x2.jpg",
            "resized/cat_99999999999x1.jpg",
            "resized/cat_thumb.jpg",
            "resized/dog_320x240.jpg",
        ];
        for key in bad {
            assert!(
                matches!(
                    parse_derived_key(key, "cat"),
                    Err(PipelineError::MalformedDerivedName(_))
                ),
                "{} should not parse",
                key
            );
        }
    }

    #[test]
    fn test_parse_rejects_longer_basename_sharing_prefix() {
        let sibling = derived_key("123-cat_2", 150, 113, "jpg");
        assert!(parse_derived_key(&sibling, "123-cat").is_err());
        assert!(parse_derived_key(&sibling, "123-cat_2").is_ok());
    }

    #[test]
    fn test_is_derived_key() {
        assert!(is_derived_key("resized/cat_150x113.jpg"));
        assert!(!is_derived_key("uploads/1-cat.jpg"));
    }
}
