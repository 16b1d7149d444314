//! Domain models exchanged between the broker, worker, resolver and poller.

pub mod grant;
pub mod provenance;
pub mod status;

pub use grant::{DownloadGrant, UploadGrant, UploadRequest};
pub use provenance::Provenance;
pub use status::{DerivedImage, ProcessingStatus, StatusReport};
