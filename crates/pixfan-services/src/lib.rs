//! Pixfan Services Layer
//!
//! The request/response side of the pipeline: the upload broker that hands
//! out write grants for new source objects, and the status resolver that
//! turns a prefix listing of the derived namespace into a status report with
//! download grants. Both are stateless and share storage through `Arc`.

pub mod broker;
pub mod download;
pub mod resolver;

pub use broker::UploadBroker;
pub use download::DownloadGrants;
pub use resolver::StatusResolver;

pub use pixfan_storage::{create_storage, ObjectStorage, StorageError, StorageResult, StorageSet};
