//! Constants shared across the pipeline.

use std::time::Duration;

/// Key prefix for source objects written through an upload grant.
pub const UPLOADS_PREFIX: &str = "uploads/";

/// Key prefix for derived objects published by the resize worker.
pub const RESIZED_PREFIX: &str = "resized/";

/// Content type assumed for uploads when the caller does not provide one.
pub const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

pub const DEFAULT_TARGET_WIDTHS: [u32; 4] = [150, 320, 640, 1024];

pub const DEFAULT_UPLOAD_TTL: Duration = Duration::from_secs(300);
pub const DEFAULT_DOWNLOAD_TTL: Duration = Duration::from_secs(3600);

pub const DEFAULT_QUALITY: u8 = 85;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_POLL_MAX_ATTEMPTS: u32 = 30;

/// Object metadata keys attached to every derived object.
pub const META_ORIGINAL_KEY: &str = "original-key";
pub const META_ORIGINAL_WIDTH: &str = "original-width";
pub const META_ORIGINAL_HEIGHT: &str = "original-height";
