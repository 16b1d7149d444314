//! Pixfan Core Library
//!
//! This crate provides the domain models, error taxonomy, configuration and the
//! derived-object naming convention shared by every pixfan component (upload
//! broker, resize worker, status resolver and client poller).
//!
//! # Naming convention
//!
//! Sources live under `uploads/{millis}-{filename}` and derivatives under
//! `resized/{basename}_{width}x{height}.{ext}`. The worker and the resolver
//! both go through [`naming`] so the two sides can never diverge.

pub mod config;
pub mod constants;
pub mod dimensions;
pub mod error;
pub mod models;
pub mod naming;
pub mod status_source;

// Re-export commonly used types
pub use config::{
    CompletionPolicy, EncodingConfig, GrantConfig, OutputFormat, PipelineConfig, PollerConfig,
    StorageBackend, StorageConfig, TargetWidths, WorkerConfig,
};
pub use error::{ErrorMetadata, LogLevel, PipelineError, PipelineResult};
pub use models::{
    DerivedImage, DownloadGrant, ProcessingStatus, Provenance, StatusReport, UploadGrant,
    UploadRequest,
};
pub use status_source::StatusSource;
