//! Pixfan Storage Library
//!
//! This crate provides the object storage abstraction the pipeline components
//! are built on, with an S3 implementation and an in-memory implementation.
//!
//! Every [`ObjectStorage`] is bound to one bucket. Components receive their
//! buckets as `Arc<dyn ObjectStorage>` at construction, so tests substitute
//! [`MemoryStorage`] without touching component code.

pub mod factory;
#[cfg(feature = "storage-memory")]
pub mod memory;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::{create_storage, StorageSet};
#[cfg(feature = "storage-memory")]
pub use memory::MemoryStorage;
pub use pixfan_core::StorageBackend;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{ObjectInfo, ObjectStorage, StorageError, StorageResult, StoredObject};
