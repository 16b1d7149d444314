//! Resize worker.
//!
//! One notification may carry several records. Records are independent:
//! they run concurrently up to `max_concurrent_records`, each with its own
//! [`WorkerState`] machine, and one record's failure never hides another's.
//! Within a record the target widths run in order and the first failure
//! aborts the rest; derivatives already published stay, and redelivery of
//! the event overwrites them with identical bytes.

use crate::notification::{S3Event, SourceRecord};
use crate::state::{RecordRun, WorkerState};
use futures::stream::{self, StreamExt};
use pixfan_core::naming::{basename, derived_key, is_derived_key};
use pixfan_core::{EncodingConfig, PipelineConfig, PipelineError, Provenance, TargetWidths};
use pixfan_processing::SourceImage;
use pixfan_storage::StorageSet;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Key is already in the derived namespace of the derived bucket.
    DerivedObject,
    /// Record reports something other than an object creation.
    NotACreation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Derived {
        source_key: String,
        derived_keys: Vec<String>,
        history: Vec<WorkerState>,
    },
    Skipped {
        key: String,
        reason: SkipReason,
    },
}

#[derive(Debug)]
pub struct RecordFailure {
    pub bucket: String,
    pub key: String,
    pub error: PipelineError,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub records: Vec<RecordOutcome>,
}

/// At least one record of a notification failed. Carries every failure,
/// plus the outcomes of the records that succeeded.
#[derive(Debug, Error)]
#[error("{} of {} notification records failed", .failures.len(), .total)]
pub struct BatchError {
    pub total: usize,
    pub failures: Vec<RecordFailure>,
    pub succeeded: Vec<RecordOutcome>,
}

#[derive(Clone)]
pub struct ResizeWorker {
    storage: StorageSet,
    targets: TargetWidths,
    encoding: EncodingConfig,
    max_concurrent_records: usize,
}

fn join_error(err: tokio::task::JoinError) -> PipelineError {
    PipelineError::ImageProcessing(format!("image task did not complete: {}", err))
}

impl ResizeWorker {
    pub fn new(storage: StorageSet, config: &PipelineConfig) -> Self {
        Self {
            storage,
            targets: config.targets.clone(),
            encoding: config.encoding.clone(),
            max_concurrent_records: config.worker.max_concurrent_records.max(1),
        }
    }

    /// Process every record of `event`.
    pub async fn handle_notification(&self, event: &S3Event) -> Result<BatchOutcome, BatchError> {
        let total = event.records.len();
        if total == 0 {
            tracing::debug!("Notification carries no records");
            return Ok(BatchOutcome::default());
        }

        let results: Vec<(String, String, Result<RecordOutcome, PipelineError>)> =
            stream::iter(event.records.iter())
                .map(|record| async move {
                    let bucket = record.s3.bucket.name.clone();
                    if !record.is_object_created() {
                        tracing::debug!(
                            bucket = %bucket,
                            event_name = %record.event_name,
                            "Ignoring non-creation record"
                        );
                        let key = record.s3.object.key.clone();
                        let skipped = RecordOutcome::Skipped {
                            key: key.clone(),
                            reason: SkipReason::NotACreation,
                        };
                        return (bucket, key, Ok(skipped));
                    }
                    match record.source() {
                        Ok(source) => {
                            let result = self.process_record(&source).await;
                            (source.bucket, source.key, result)
                        }
                        Err(e) => (bucket, record.s3.object.key.clone(), Err(e)),
                    }
                })
                .buffered(self.max_concurrent_records)
                .collect()
                .await;

        let mut succeeded = Vec::with_capacity(total);
        let mut failures = Vec::new();
        for (bucket, key, result) in results {
            match result {
                Ok(outcome) => succeeded.push(outcome),
                Err(error) => failures.push(RecordFailure { bucket, key, error }),
            }
        }

        if failures.is_empty() {
            return Ok(BatchOutcome { records: succeeded });
        }

        for failure in &failures {
            tracing::error!(
                bucket = %failure.bucket,
                key = %failure.key,
                error = %failure.error,
                "Notification record failed"
            );
        }
        Err(BatchError {
            total,
            failures,
            succeeded,
        })
    }

    /// Derive and publish every target width of one source object.
    #[tracing::instrument(skip(self), fields(bucket = %record.bucket, key = %record.key))]
    pub async fn process_record(&self, record: &SourceRecord) -> Result<RecordOutcome, PipelineError> {
        if record.bucket == self.storage.resized.bucket() && is_derived_key(&record.key) {
            tracing::info!("Skipping derived object");
            return Ok(RecordOutcome::Skipped {
                key: record.key.clone(),
                reason: SkipReason::DerivedObject,
            });
        }
        if record.bucket != self.storage.uploads.bucket() {
            return Err(PipelineError::InvalidRequest(format!(
                "notification for unknown bucket {}",
                record.bucket
            )));
        }

        let start = Instant::now();
        let mut run = RecordRun::new(&record.key);
        match self.derive_all(record, &mut run).await {
            Ok(derived_keys) => {
                run.advance(WorkerState::Done);
                tracing::info!(
                    derived = derived_keys.len(),
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Source object processed"
                );
                Ok(RecordOutcome::Derived {
                    source_key: record.key.clone(),
                    derived_keys,
                    history: run.into_history(),
                })
            }
            Err(e) => {
                let failed_in = run.state();
                run.advance(WorkerState::Failed);
                tracing::error!(
                    error = %e,
                    state = %failed_in,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Source object processing failed"
                );
                Err(e)
            }
        }
    }

    async fn derive_all(
        &self,
        record: &SourceRecord,
        run: &mut RecordRun<'_>,
    ) -> Result<Vec<String>, PipelineError> {
        run.advance(WorkerState::Fetching);
        let object = self.storage.uploads.get(&record.key).await?;
        let size_bytes = object.data.len();
        let data = object.data;
        let source = tokio::task::spawn_blocking(move || SourceImage::decode(&data))
            .await
            .map_err(join_error)??;
        let source = Arc::new(source);

        let (original_width, original_height) = source.dimensions();
        tracing::info!(
            width = original_width,
            height = original_height,
            size_bytes,
            "Source image decoded"
        );

        let metadata = Provenance {
            original_key: record.key.clone(),
            original_width,
            original_height,
        }
        .to_metadata();
        let basename = basename(&record.key);

        let mut published = Vec::with_capacity(self.targets.len());
        for (index, &width) in self.targets.as_slice().iter().enumerate() {
            run.advance(WorkerState::Deriving { index, width });
            let image = Arc::clone(&source);
            let encoding = self.encoding.clone();
            let output = tokio::task::spawn_blocking(move || image.derive(width, &encoding))
                .await
                .map_err(join_error)??;

            run.advance(WorkerState::Publishing { index, width });
            let key = derived_key(basename, output.width, output.height, output.extension);
            let size_bytes = output.data.len();
            self.storage
                .resized
                .put(&key, output.data, output.content_type, &metadata)
                .await?;

            tracing::info!(
                derived_key = %key,
                width = output.width,
                height = output.height,
                size_bytes,
                "Derived image published"
            );
            published.push(key);
        }

        Ok(published)
    }
}
