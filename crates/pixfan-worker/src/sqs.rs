//! SQS consumer for S3 event notifications.
//!
//! A message is deleted only when every record of its notification
//! succeeded. Anything else stays on the queue and becomes visible again
//! after the visibility timeout, so failed records are retried by
//! redelivery; the queue's redrive policy bounds the retries.

use crate::notification::S3Event;
use crate::worker::ResizeWorker;
use anyhow::{anyhow, Result};
use aws_config::BehaviorVersion;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::Message;
use aws_sdk_sqs::Client;
use pixfan_core::PipelineConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Pause after a failed receive before polling again.
const RECEIVE_RETRY_DELAY: Duration = Duration::from_secs(5);

/// What to do with a message once its body has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageDisposition {
    Delete,
    Retain,
}

/// Run the worker over one message body.
pub async fn process_body(worker: &ResizeWorker, body: &str) -> MessageDisposition {
    let event = match S3Event::parse(body) {
        Ok(event) => event,
        Err(e) => {
            tracing::error!(error = %e, "Message body is not an S3 notification");
            return MessageDisposition::Retain;
        }
    };

    match worker.handle_notification(&event).await {
        Ok(outcome) => {
            tracing::debug!(records = outcome.records.len(), "Notification processed");
            MessageDisposition::Delete
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                failed = e.failures.len(),
                "Notification left for redelivery"
            );
            MessageDisposition::Retain
        }
    }
}

pub struct SqsConsumer {
    client: Client,
    queue_url: String,
    worker: Arc<ResizeWorker>,
    wait_time_secs: i32,
    max_messages: i32,
}

impl SqsConsumer {
    pub fn new(
        client: Client,
        queue_url: String,
        worker: Arc<ResizeWorker>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            client,
            queue_url,
            worker,
            wait_time_secs: config.worker.sqs_wait_time_secs,
            max_messages: config.worker.sqs_max_messages,
        }
    }

    /// Build a consumer from `SQS_QUEUE_URL` and the default AWS credential chain.
    pub async fn from_config(worker: Arc<ResizeWorker>, config: &PipelineConfig) -> Result<Self> {
        let queue_url = config
            .worker
            .sqs_queue_url
            .clone()
            .ok_or_else(|| anyhow!("SQS_QUEUE_URL must be set to consume notifications"))?;

        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(ref region) = config.storage.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        let aws_config = loader.load().await;

        Ok(Self::new(Client::new(&aws_config), queue_url, worker, config))
    }

    /// Receive and process messages until `shutdown` is cancelled.
    ///
    /// A batch in flight when shutdown is requested is finished first.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        tracing::info!(
            queue_url = %self.queue_url,
            wait_time_secs = self.wait_time_secs,
            max_messages = self.max_messages,
            "SQS consumer started"
        );

        loop {
            let received = tokio::select! {
                _ = shutdown.cancelled() => break,
                result = self
                    .client
                    .receive_message()
                    .queue_url(&self.queue_url)
                    .max_number_of_messages(self.max_messages)
                    .wait_time_seconds(self.wait_time_secs)
                    .send() => result,
            };

            let output = match received {
                Ok(output) => output,
                Err(e) => {
                    tracing::error!(error = %DisplayErrorContext(&e), "Failed to receive messages");
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(RECEIVE_RETRY_DELAY) => continue,
                    }
                }
            };

            for message in output.messages() {
                self.handle_message(message).await;
            }
        }

        tracing::info!("SQS consumer stopped");
        Ok(())
    }

    async fn handle_message(&self, message: &Message) {
        let message_id = message.message_id().unwrap_or("unknown");
        let Some(body) = message.body() else {
            tracing::warn!(message_id = %message_id, "Message without body");
            return;
        };

        if process_body(&self.worker, body).await == MessageDisposition::Retain {
            return;
        }

        let Some(receipt_handle) = message.receipt_handle() else {
            tracing::warn!(message_id = %message_id, "Message without receipt handle");
            return;
        };
        if let Err(e) = self
            .client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
        {
            // The message comes back after the visibility timeout and is
            // re-derived with identical output.
            tracing::error!(
                message_id = %message_id,
                error = %DisplayErrorContext(&e),
                "Failed to delete processed message"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixfan_storage::{MemoryStorage, StorageSet};

    fn worker(uploads: &MemoryStorage) -> ResizeWorker {
        let storage = StorageSet::new(
            Arc::new(uploads.clone()),
            Arc::new(MemoryStorage::new("resized")),
        );
        ResizeWorker::new(storage, &PipelineConfig::default())
    }

    #[tokio::test]
    async fn test_test_event_is_deleted() {
        let uploads = MemoryStorage::new("uploads");
        let body = r#"{"Service":"Amazon S3","Event":"s3:TestEvent","Bucket":"uploads"}"#;
        assert_eq!(
            process_body(&worker(&uploads), body).await,
            MessageDisposition::Delete
        );
    }

    #[tokio::test]
    async fn test_failed_record_is_retained() {
        let uploads = MemoryStorage::new("uploads");
        let body = r#"{"Records":[{"eventName":"ObjectCreated:Put","s3":{"bucket":{"name":"uploads"},"object":{"key":"uploads/missing.jpg"}}}]}"#;
        assert_eq!(
            process_body(&worker(&uploads), body).await,
            MessageDisposition::Retain
        );
    }

    #[tokio::test]
    async fn test_garbage_body_is_retained() {
        let uploads = MemoryStorage::new("uploads");
        assert_eq!(
            process_body(&worker(&uploads), "{not json").await,
            MessageDisposition::Retain
        );
    }
}
