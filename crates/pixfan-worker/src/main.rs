use anyhow::{Context, Result};
use pixfan_core::PipelineConfig;
use pixfan_storage::create_storage;
use pixfan_worker::telemetry::{init_tracing, LogFormat};
use pixfan_worker::{ResizeWorker, S3Event};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    let config = PipelineConfig::from_env().context("Failed to load configuration")?;
    init_tracing(LogFormat::from_env()).context("Failed to initialize tracing")?;

    tracing::info!(
        backend = %config.storage.backend,
        uploads_bucket = %config.storage.uploads_bucket,
        resized_bucket = %config.storage.resized_bucket,
        widths = ?config.targets.as_slice(),
        format = ?config.encoding.format,
        quality = config.encoding.quality,
        "Starting pixfan worker"
    );

    let storage = create_storage(&config.storage).context("Failed to create storage")?;
    let worker = Arc::new(ResizeWorker::new(storage, &config));

    #[cfg(feature = "sqs")]
    if config.worker.sqs_queue_url.is_some() {
        let consumer = pixfan_worker::SqsConsumer::from_config(worker, &config).await?;
        let shutdown = CancellationToken::new();
        tokio::spawn(shutdown_signal(shutdown.clone()));
        return consumer.run(shutdown).await;
    }

    // Without a queue, handle a single notification read from stdin.
    let mut body = String::new();
    tokio::io::stdin()
        .read_to_string(&mut body)
        .await
        .context("Failed to read notification from stdin")?;
    let event = S3Event::parse(&body)?;

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));
    tokio::select! {
        _ = shutdown.cancelled() => {
            anyhow::bail!("Interrupted before the notification was processed");
        }
        result = worker.handle_notification(&event) => {
            let outcome = result?;
            tracing::info!(records = outcome.records.len(), "Notification processed");
        }
    }
    Ok(())
}

/// Cancel `shutdown` on Ctrl+C or SIGTERM.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal");
        },
    }

    tracing::info!("Shutting down gracefully...");
    shutdown.cancel();
}
