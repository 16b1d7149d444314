//! Client-side wait for derivation.
//!
//! Attempt `i` (0-based) starts no earlier than `start + i * interval`, and no
//! attempt starts after `start + interval * max_attempts`, so the whole wait
//! is bounded by `interval * max_attempts` plus one request timeout.

use pixfan_core::{
    DerivedImage, ErrorMetadata, PipelineError, PollerConfig, StatusReport, StatusSource,
};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Upper bound on one status request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct Poller<S> {
    source: S,
    interval: Duration,
    max_attempts: u32,
    request_timeout: Duration,
}

impl<S: StatusSource> Poller<S> {
    pub fn new(source: S, config: PollerConfig) -> Self {
        Self {
            source,
            interval: config.interval,
            max_attempts: config.max_attempts.max(1),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Poll `original_key` until it is complete with at least one image.
    ///
    /// Recoverable errors (transport failures, storage hiccups, request
    /// timeouts) use up an attempt; other errors end the wait.
    #[tracing::instrument(skip(self, cancel), fields(max_attempts = self.max_attempts))]
    pub async fn wait_for_completion(
        &self,
        original_key: &str,
        cancel: &CancellationToken,
    ) -> Result<StatusReport, PipelineError> {
        let start = Instant::now();
        let deadline = start + self.interval * self.max_attempts;
        let mut last_seen = 0usize;
        let mut attempts = 0u32;

        while attempts < self.max_attempts {
            let scheduled = start + self.interval * attempts;
            // Only reachable when earlier requests overran their slots.
            if attempts > 0 && !self.interval.is_zero() && Instant::now() >= deadline {
                break;
            }
            tokio::select! {
                _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
                _ = tokio::time::sleep_until(scheduled) => {}
            }
            attempts += 1;

            let result = tokio::select! {
                _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
                result = tokio::time::timeout(self.request_timeout, self.source.status(original_key)) => {
                    result.unwrap_or_else(|_| {
                        Err(PipelineError::Transport(format!(
                            "status request timed out after {:?}",
                            self.request_timeout
                        )))
                    })
                }
            };

            match result {
                Ok(report) => {
                    let found = report.images.len();
                    if found < last_seen {
                        tracing::warn!(
                            attempt = attempts,
                            previous = last_seen,
                            found,
                            "Derived image list shrank between polls"
                        );
                    }
                    last_seen = found;

                    if report.is_complete() && found > 0 {
                        tracing::info!(attempt = attempts, images = found, "Derivation complete");
                        return Ok(report);
                    }
                    tracing::debug!(attempt = attempts, images = found, "Still processing");
                }
                Err(e) if e.is_recoverable() => {
                    tracing::warn!(attempt = attempts, error = %e, "Status check failed");
                }
                Err(e) => return Err(e),
            }
        }

        tracing::warn!(attempts, "Gave up waiting for derivation");
        Err(PipelineError::ProcessingTimeout { attempts })
    }

    pub async fn wait_for_images(
        &self,
        original_key: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<DerivedImage>, PipelineError> {
        Ok(self.wait_for_completion(original_key, cancel).await?.images)
    }
}
