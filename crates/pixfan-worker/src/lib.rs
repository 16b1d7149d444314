//! Pixfan Resize Worker
//!
//! Reacts to object-creation notifications for uploaded images and publishes
//! one derivative per configured width under the shared naming convention.
//! The worker entry point is [`ResizeWorker::handle_notification`]; the
//! [`sqs`] module feeds it from an SQS queue subscribed to the upload bucket.

pub mod notification;
#[cfg(feature = "sqs")]
pub mod sqs;
pub mod state;
pub mod telemetry;
pub mod worker;

pub use notification::{decode_object_key, S3Event, S3EventRecord, SourceRecord};
#[cfg(feature = "sqs")]
pub use sqs::{process_body, MessageDisposition, SqsConsumer};
pub use state::WorkerState;
pub use worker::{BatchError, BatchOutcome, RecordFailure, RecordOutcome, ResizeWorker, SkipReason};
