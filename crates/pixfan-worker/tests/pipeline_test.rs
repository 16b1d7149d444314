//! Worker and resolver driven together over in-memory buckets.

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use pixfan_core::{
    CompletionPolicy, PipelineConfig, PipelineError, ProcessingStatus, Provenance, TargetWidths,
};
use pixfan_services::StatusResolver;
use pixfan_storage::{MemoryStorage, ObjectStorage, StorageSet};
use pixfan_worker::{RecordOutcome, ResizeWorker, S3Event};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

struct Pipeline {
    uploads: MemoryStorage,
    resized: MemoryStorage,
    config: PipelineConfig,
}

impl Pipeline {
    fn new(widths: &[u32]) -> Self {
        let mut config = PipelineConfig::default();
        config.targets = TargetWidths::new(widths.iter().copied()).unwrap();
        Self {
            uploads: MemoryStorage::new("uploads"),
            resized: MemoryStorage::new("resized"),
            config,
        }
    }

    fn storage(&self) -> StorageSet {
        StorageSet::new(
            Arc::new(self.uploads.clone()),
            Arc::new(self.resized.clone()),
        )
    }

    fn worker(&self) -> ResizeWorker {
        ResizeWorker::new(self.storage(), &self.config)
    }

    fn resolver(&self) -> StatusResolver {
        StatusResolver::new(&self.storage(), &self.config)
    }

    async fn upload_jpeg(&self, key: &str, width: u32, height: u32) {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let mut buffer = Vec::new();
        img.write_with_encoder(JpegEncoder::new_with_quality(&mut buffer, 90))
            .unwrap();
        self.uploads
            .put(key, Bytes::from(buffer), "image/jpeg", &BTreeMap::new())
            .await
            .unwrap();
    }

    fn snapshot(&self) -> Vec<(String, Bytes)> {
        self.resized
            .keys()
            .into_iter()
            .map(|key| {
                let data = self.resized.object_bytes(&key).unwrap();
                (key, data)
            })
            .collect()
    }
}

/// Notification as S3 writes it: keys URL-encoded with `+` for spaces.
fn created_event(keys: &[&str]) -> S3Event {
    let records: Vec<_> = keys
        .iter()
        .map(|key| {
            json!({
                "eventName": "ObjectCreated:Put",
                "s3": {
                    "bucket": {"name": "uploads"},
                    "object": {"key": key.replace(' ', "+"), "size": 1}
                }
            })
        })
        .collect();
    S3Event::parse(&json!({ "Records": records }).to_string()).unwrap()
}

#[tokio::test]
async fn test_derives_every_width_with_provenance() {
    let pipeline = Pipeline::new(&[150, 320]);
    pipeline.upload_jpeg("uploads/cat.jpg", 800, 600).await;

    let outcome = pipeline
        .worker()
        .handle_notification(&created_event(&["uploads/cat.jpg"]))
        .await
        .unwrap();
    assert_eq!(outcome.records.len(), 1);

    assert_eq!(
        pipeline.resized.keys(),
        vec!["resized/cat_150x113.jpg", "resized/cat_320x240.jpg"]
    );

    let object = pipeline.resized.get("resized/cat_150x113.jpg").await.unwrap();
    assert_eq!(object.content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(
        Provenance::from_metadata(&object.metadata),
        Some(Provenance {
            original_key: "uploads/cat.jpg".to_string(),
            original_width: 800,
            original_height: 600,
        })
    );
    let decoded = image::load_from_memory(&object.data).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (150, 113));
}

#[tokio::test]
async fn test_encoded_key_with_spaces() {
    let pipeline = Pipeline::new(&[150]);
    pipeline.upload_jpeg("uploads/1-my cat.jpg", 300, 200).await;

    pipeline
        .worker()
        .handle_notification(&created_event(&["uploads/1-my cat.jpg"]))
        .await
        .unwrap();
    assert_eq!(pipeline.resized.keys(), vec!["resized/1-my cat_150x100.jpg"]);
}

#[tokio::test]
async fn test_redelivery_is_idempotent() {
    let pipeline = Pipeline::new(&[150, 320, 640]);
    pipeline.upload_jpeg("uploads/1-cat.jpg", 800, 600).await;
    let event = created_event(&["uploads/1-cat.jpg"]);

    pipeline.worker().handle_notification(&event).await.unwrap();
    let first = pipeline.snapshot();

    pipeline.worker().handle_notification(&event).await.unwrap();
    let second = pipeline.snapshot();

    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
    assert_eq!(pipeline.resized.put_count(), 6);
}

#[tokio::test]
async fn test_failed_target_aborts_remaining_and_keeps_published() {
    let pipeline = Pipeline::new(&[150, 320, 640]);
    pipeline.upload_jpeg("uploads/1-cat.jpg", 800, 600).await;
    pipeline.resized.fail_puts_to("resized/1-cat_320x240.jpg");

    let err = pipeline
        .worker()
        .handle_notification(&created_event(&["uploads/1-cat.jpg"]))
        .await
        .unwrap_err();

    assert_eq!(err.total, 1);
    assert_eq!(err.failures.len(), 1);
    assert_eq!(err.failures[0].key, "uploads/1-cat.jpg");
    assert!(matches!(
        err.failures[0].error,
        PipelineError::UpstreamStorage(_)
    ));
    assert_eq!(pipeline.resized.keys(), vec!["resized/1-cat_150x113.jpg"]);

    // The partial state reads as still processing.
    let report = pipeline.resolver().get_status("uploads/1-cat.jpg").await.unwrap();
    assert_eq!(report.status, ProcessingStatus::Processing);
    assert_eq!(report.images.len(), 1);
}

#[tokio::test]
async fn test_redelivery_after_failure_converges() {
    let pipeline = Pipeline::new(&[150, 320, 640]);
    pipeline.upload_jpeg("uploads/1-cat.jpg", 800, 600).await;
    let event = created_event(&["uploads/1-cat.jpg"]);

    pipeline.resized.fail_puts_to("resized/1-cat_640x480.jpg");
    assert!(pipeline.worker().handle_notification(&event).await.is_err());

    pipeline.resized.clear_failures();
    pipeline.worker().handle_notification(&event).await.unwrap();

    let report = pipeline.resolver().get_status("uploads/1-cat.jpg").await.unwrap();
    assert!(report.is_complete());
    let widths: Vec<u32> = report.images.iter().map(|i| i.width).collect();
    assert_eq!(widths, vec![150, 320, 640]);
}

#[tokio::test]
async fn test_one_failing_record_does_not_hide_others() {
    let pipeline = Pipeline::new(&[150]);
    pipeline.upload_jpeg("uploads/1-cat.jpg", 800, 600).await;
    pipeline.upload_jpeg("uploads/3-owl.jpg", 600, 800).await;

    let err = pipeline
        .worker()
        .handle_notification(&created_event(&[
            "uploads/1-cat.jpg",
            "uploads/2-missing.jpg",
            "uploads/3-owl.jpg",
        ]))
        .await
        .unwrap_err();

    assert_eq!(err.total, 3);
    let failed: Vec<&str> = err.failures.iter().map(|f| f.key.as_str()).collect();
    assert_eq!(failed, vec!["uploads/2-missing.jpg"]);
    assert_eq!(err.succeeded.len(), 2);
    assert!(err
        .succeeded
        .iter()
        .all(|o| matches!(o, RecordOutcome::Derived { .. })));
    assert_eq!(
        pipeline.resized.keys(),
        vec!["resized/1-cat_150x113.jpg", "resized/3-owl_150x200.jpg"]
    );
}

#[tokio::test]
async fn test_concurrent_records_in_one_batch() {
    let mut pipeline = Pipeline::new(&[150, 320]);
    pipeline.config.worker.max_concurrent_records = 2;
    let keys: Vec<String> = (0..6).map(|i| format!("uploads/{}-img.jpg", i)).collect();
    for key in &keys {
        pipeline.upload_jpeg(key, 400, 300).await;
    }

    let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
    let outcome = pipeline
        .worker()
        .handle_notification(&created_event(&key_refs))
        .await
        .unwrap();

    assert_eq!(outcome.records.len(), 6);
    assert_eq!(pipeline.resized.keys().len(), 12);
}

#[tokio::test]
async fn test_resolver_policies_over_partial_output() {
    let pipeline = Pipeline::new(&[150, 320, 640, 1024]);
    pipeline.upload_jpeg("uploads/1-cat.jpg", 800, 600).await;
    pipeline.resized.fail_puts_to("resized/1-cat_640x480.jpg");
    let _ = pipeline
        .worker()
        .handle_notification(&created_event(&["uploads/1-cat.jpg"]))
        .await;

    let all = pipeline.resolver().get_status("uploads/1-cat.jpg").await.unwrap();
    assert_eq!(all.status, ProcessingStatus::Processing);
    assert_eq!(all.images.len(), 2);

    let any = pipeline
        .resolver()
        .with_policy(CompletionPolicy::RequireAny)
        .get_status("uploads/1-cat.jpg")
        .await
        .unwrap();
    assert_eq!(any.status, ProcessingStatus::Complete);
    assert_eq!(any.images.len(), 2);
}
