//! Seam between the client poller and whatever answers status queries.
//!
//! The in-process status resolver and the HTTP API client both implement
//! [`StatusSource`], so the poller can be driven against either.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::PipelineError;
use crate::models::StatusReport;

#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Current derivation status of `original_key`.
    async fn status(&self, original_key: &str) -> Result<StatusReport, PipelineError>;
}

#[async_trait]
impl<T: StatusSource + ?Sized> StatusSource for Arc<T> {
    async fn status(&self, original_key: &str) -> Result<StatusReport, PipelineError> {
        (**self).status(original_key).await
    }
}
