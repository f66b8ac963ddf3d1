use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use log::{debug, info, warn};

use crate::cloud::object_store::{ObjectLocation, ObjectStore};
use crate::config::TransferSettings;
use crate::constants::PROGRESS_REPORT_INTERVAL_SECS;
use crate::error::{BackupError, Result};
use crate::transfer::conduit::byte_conduit;
use crate::transfer::progress::{throughput_mb_per_sec, ProgressTracker};
use crate::vault::{Session, SnapshotSource};

/// Destination of one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferJob {
    pub bucket: String,
    pub key: String,
}

impl TransferJob {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self { bucket: bucket.into(), key: key.into() }
    }
}

/// Result of a successful transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    pub location: ObjectLocation,
    /// Bytes the snapshot source reported writing
    pub bytes_exported: u64,
}

/// Stream one snapshot from `source` into `store`.
///
/// The export runs on its own task and writes into a bounded conduit; the
/// upload reads the other end on the calling task. The producer is always
/// joined before this returns, so its error is never lost.
pub async fn run_transfer<S>(
    source: Arc<S>,
    session: Session,
    store: &dyn ObjectStore,
    job: &TransferJob,
    settings: TransferSettings,
) -> Result<TransferReport>
where
    S: SnapshotSource + ?Sized + 'static,
{
    let (mut writer, reader) = byte_conduit(settings.conduit_capacity);
    let state = writer.state();
    let started = Instant::now();

    debug!(
        "Starting transfer to s3://{}/{} (conduit {} bytes, parts {} bytes)",
        job.bucket, job.key, settings.conduit_capacity, settings.part_size
    );

    let producer = tokio::spawn(async move {
        match source.export_snapshot(&session, &mut writer).await {
            Ok(bytes) => {
                writer
                    .close()
                    .await
                    .map_err(|e| anyhow!("Failed to close snapshot stream: {}", e))?;
                Ok::<u64, anyhow::Error>(bytes)
            }
            Err(e) => {
                writer.abort(format!("{:#}", e));
                Err(e)
            }
        }
    });

    let progress = ProgressTracker::new(Arc::clone(&state), Duration::from_secs(PROGRESS_REPORT_INTERVAL_SECS))
        .start_tracking();

    let uploaded = store.streaming_upload(&job.bucket, &job.key, Box::new(reader)).await;
    let produced = producer.await;
    progress.abort();

    let exported = match produced {
        Ok(Ok(bytes)) => Ok(bytes),
        Ok(Err(e)) => Err(BackupError::export(format!("{:#}", e))),
        Err(join_err) if join_err.is_panic() => Err(BackupError::export("snapshot producer panicked")),
        Err(join_err) => Err(BackupError::export(format!("snapshot producer failed: {}", join_err))),
    };

    match (exported, uploaded) {
        (Ok(bytes_exported), Ok(location)) => {
            let elapsed = started.elapsed();
            info!(
                "Transferred {} bytes to {} in {:.1}s ({:.2} MB/s)",
                location.bytes,
                location.uri(),
                elapsed.as_secs_f64(),
                throughput_mb_per_sec(location.bytes, elapsed)
            );
            Ok(TransferReport { location, bytes_exported })
        }
        (Ok(_), Err(upload_err)) => Err(upload_err),
        (Err(export_err), Err(upload_err)) => {
            if state.reader_abandoned() {
                // The upload gave up first; the export only saw a broken pipe.
                warn!("Snapshot export stopped after the upload failed: {}", export_err);
                Err(upload_err)
            } else {
                warn!("Upload failed because the snapshot stream was aborted: {}", upload_err);
                Err(export_err)
            }
        }
        (Err(export_err), Ok(location)) => {
            warn!("Object {} was written but the export reported an error", location.uri());
            Err(export_err)
        }
    }
}
