//! Configuration module
//!
//! Every component receives its settings through an explicit [`PipelineConfig`]
//! at construction time. [`PipelineConfig::from_env`] is the only place that
//! reads the process environment.

use std::env;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_DOWNLOAD_TTL, DEFAULT_POLL_INTERVAL, DEFAULT_POLL_MAX_ATTEMPTS, DEFAULT_QUALITY,
    DEFAULT_TARGET_WIDTHS, DEFAULT_UPLOAD_TTL,
};
use crate::error::PipelineError;

const MAX_CONCURRENT_RECORDS: usize = 4;
const SQS_WAIT_TIME_SECS: i32 = 20;
const SQS_MAX_MESSAGES: i32 = 10;

/// Storage backend types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    S3,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "s3" => Ok(StorageBackend::S3),
            "memory" => Ok(StorageBackend::Memory),
            _ => Err(PipelineError::Configuration(format!(
                "Invalid storage backend: {}",
                s
            ))),
        }
    }
}

impl Display for StorageBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StorageBackend::S3 => write!(f, "s3"),
            StorageBackend::Memory => write!(f, "memory"),
        }
    }
}

/// Encoded format of every derived object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
    WebP,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self, PipelineError> {
        match s.trim().to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::WebP),
            _ => Err(PipelineError::Configuration(format!(
                "Invalid output format: {}",
                s
            ))),
        }
    }

    /// File extension used in derived keys.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
        }
    }

    pub fn to_mime_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::WebP => "image/webp",
        }
    }
}

/// Rule the status resolver applies before reporting `complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionPolicy {
    /// Every configured target width has a derived object.
    #[default]
    RequireAll,
    /// At least one derived object exists.
    RequireAny,
}

impl FromStr for CompletionPolicy {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" | "require_all" => Ok(CompletionPolicy::RequireAll),
            "any" | "require_any" => Ok(CompletionPolicy::RequireAny),
            _ => Err(PipelineError::Configuration(format!(
                "Invalid completion policy: {} (expected 'all' or 'any')",
                s
            ))),
        }
    }
}

/// Ordered, deduplicated list of positive target widths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetWidths(Vec<u32>);

impl TargetWidths {
    /// Build from a list of widths. Duplicates are dropped keeping the first
    /// occurrence; zero widths and an empty list are rejected.
    pub fn new(widths: impl IntoIterator<Item = u32>) -> Result<Self, PipelineError> {
        let mut out: Vec<u32> = Vec::new();
        for width in widths {
            if width == 0 {
                return Err(PipelineError::Configuration(
                    "Target widths must be positive".to_string(),
                ));
            }
            if !out.contains(&width) {
                out.push(width);
            }
        }
        if out.is_empty() {
            return Err(PipelineError::Configuration(
                "At least one target width is required".to_string(),
            ));
        }
        Ok(TargetWidths(out))
    }

    /// Parse a comma separated list such as `150,320,640`.
    pub fn parse(s: &str) -> Result<Self, PipelineError> {
        let widths = s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.parse::<u32>().map_err(|_| {
                    PipelineError::Configuration(format!("Invalid target width: {}", part))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(widths)
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, width: u32) -> bool {
        self.0.contains(&width)
    }
}

impl Default for TargetWidths {
    fn default() -> Self {
        TargetWidths(DEFAULT_TARGET_WIDTHS.to_vec())
    }
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Bucket receiving client uploads (the source of creation events).
    pub uploads_bucket: String,
    /// Bucket receiving derived objects. May equal `uploads_bucket`.
    pub resized_bucket: String,
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible providers (MinIO, etc.)
    pub endpoint: Option<String>,
}

impl StorageConfig {
    /// Whether source and derived objects share one bucket.
    pub fn shares_bucket(&self) -> bool {
        self.uploads_bucket == self.resized_bucket
    }
}

#[derive(Clone, Debug)]
pub struct EncodingConfig {
    pub format: OutputFormat,
    /// Encoder quality, 1..=100. Only lossy formats use it.
    pub quality: u8,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Jpeg,
            quality: DEFAULT_QUALITY,
        }
    }
}

#[derive(Clone, Debug)]
pub struct GrantConfig {
    /// CDN front end domain, e.g. `d111111abcdef8.cloudfront.net`.
    pub cdn_domain: Option<String>,
    pub upload_ttl: Duration,
    pub download_ttl: Duration,
}

impl Default for GrantConfig {
    fn default() -> Self {
        Self {
            cdn_domain: None,
            upload_ttl: DEFAULT_UPLOAD_TTL,
            download_ttl: DEFAULT_DOWNLOAD_TTL,
        }
    }
}

#[derive(Clone, Debug)]
pub struct WorkerConfig {
    pub max_concurrent_records: usize,
    pub sqs_queue_url: Option<String>,
    pub sqs_wait_time_secs: i32,
    pub sqs_max_messages: i32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_records: MAX_CONCURRENT_RECORDS,
            sqs_queue_url: None,
            sqs_wait_time_secs: SQS_WAIT_TIME_SECS,
            sqs_max_messages: SQS_MAX_MESSAGES,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PollerConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_POLL_MAX_ATTEMPTS,
        }
    }
}

/// Pipeline configuration.
///
/// `Default` yields an in-memory setup with the reference targets
/// (`150,320,640,1024`), JPEG quality 85 and the `RequireAll` completion rule.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub storage: StorageConfig,
    pub targets: TargetWidths,
    pub encoding: EncodingConfig,
    pub grants: GrantConfig,
    pub completion_policy: CompletionPolicy,
    pub worker: WorkerConfig,
    pub poller: PollerConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                backend: StorageBackend::Memory,
                uploads_bucket: "uploads".to_string(),
                resized_bucket: "resized".to_string(),
                region: None,
                endpoint: None,
            },
            targets: TargetWidths::default(),
            encoding: EncodingConfig::default(),
            grants: GrantConfig::default(),
            completion_policy: CompletionPolicy::default(),
            worker: WorkerConfig::default(),
            poller: PollerConfig::default(),
        }
    }
}

fn env_secs(name: &str, default: Duration) -> Result<Duration, PipelineError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| PipelineError::Configuration(format!("{} must be a number", name))),
        Err(_) => Ok(default),
    }
}

fn env_parse<T: FromStr>(name: &str, default: T) -> Result<T, PipelineError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| PipelineError::Configuration(format!("{} has an invalid value", name))),
        Err(_) => Ok(default),
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, PipelineError> {
        dotenvy::dotenv().ok();

        let backend = match env::var("STORAGE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => StorageBackend::S3,
        };

        let storage = StorageConfig {
            backend,
            uploads_bucket: non_empty_var("UPLOADS_BUCKET").unwrap_or_default(),
            resized_bucket: non_empty_var("RESIZED_BUCKET").unwrap_or_default(),
            region: non_empty_var("S3_REGION").or_else(|| non_empty_var("AWS_REGION")),
            endpoint: non_empty_var("S3_ENDPOINT"),
        };

        let targets = match env::var("RESIZE_WIDTHS") {
            Ok(value) => TargetWidths::parse(&value)?,
            Err(_) => TargetWidths::default(),
        };

        let encoding = EncodingConfig {
            format: match env::var("RESIZE_FORMAT") {
                Ok(value) => OutputFormat::parse(&value)?,
                Err(_) => OutputFormat::Jpeg,
            },
            quality: env_parse("RESIZE_QUALITY", DEFAULT_QUALITY)?,
        };

        let grants = GrantConfig {
            cdn_domain: non_empty_var("CDN_DOMAIN").or_else(|| non_empty_var("CLOUDFRONT_DOMAIN")),
            upload_ttl: env_secs("UPLOAD_URL_TTL_SECS", DEFAULT_UPLOAD_TTL)?,
            download_ttl: env_secs("DOWNLOAD_URL_TTL_SECS", DEFAULT_DOWNLOAD_TTL)?,
        };

        let completion_policy = match env::var("COMPLETION_POLICY") {
            Ok(value) => value.parse()?,
            Err(_) => CompletionPolicy::default(),
        };

        let worker = WorkerConfig {
            max_concurrent_records: env_parse(
                "WORKER_MAX_CONCURRENT_RECORDS",
                MAX_CONCURRENT_RECORDS,
            )?,
            sqs_queue_url: non_empty_var("SQS_QUEUE_URL"),
            sqs_wait_time_secs: env_parse("SQS_WAIT_TIME_SECS", SQS_WAIT_TIME_SECS)?,
            sqs_max_messages: env_parse("SQS_MAX_MESSAGES", SQS_MAX_MESSAGES)?,
        };

        let poller = PollerConfig {
            interval: Duration::from_millis(env_parse(
                "POLL_INTERVAL_MS",
                DEFAULT_POLL_INTERVAL.as_millis() as u64,
            )?),
            max_attempts: env_parse("POLL_MAX_ATTEMPTS", DEFAULT_POLL_MAX_ATTEMPTS)?,
        };

        let config = PipelineConfig {
            storage,
            targets,
            encoding,
            grants,
            completion_policy,
            worker,
            poller,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.storage.uploads_bucket.is_empty() {
            return Err(PipelineError::Configuration(
                "UPLOADS_BUCKET must be set".to_string(),
            ));
        }
        if self.storage.resized_bucket.is_empty() {
            return Err(PipelineError::Configuration(
                "RESIZED_BUCKET must be set".to_string(),
            ));
        }
        if self.storage.backend == StorageBackend::S3 && self.storage.region.is_none() {
            return Err(PipelineError::Configuration(
                "S3_REGION or AWS_REGION must be set for the s3 backend".to_string(),
            ));
        }
        if !(1..=100).contains(&self.encoding.quality) {
            return Err(PipelineError::Configuration(format!(
                "RESIZE_QUALITY must be between 1 and 100, got {}",
                self.encoding.quality
            )));
        }
        if self.grants.upload_ttl.is_zero() || self.grants.download_ttl.is_zero() {
            return Err(PipelineError::Configuration(
                "Grant TTLs must be greater than zero".to_string(),
            ));
        }
        if let Some(domain) = &self.grants.cdn_domain {
            if domain.contains("://") || domain.ends_with('/') {
                return Err(PipelineError::Configuration(format!(
                    "CDN_DOMAIN must be a bare host name, got {}",
                    domain
                )));
            }
        }
        if self.worker.max_concurrent_records == 0 {
            return Err(PipelineError::Configuration(
                "WORKER_MAX_CONCURRENT_RECORDS must be at least 1".to_string(),
            ));
        }
        if !(1..=10).contains(&self.worker.sqs_max_messages) {
            return Err(PipelineError::Configuration(
                "SQS_MAX_MESSAGES must be between 1 and 10".to_string(),
            ));
        }
        if self.poller.max_attempts == 0 {
            return Err(PipelineError::Configuration(
                "POLL_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
