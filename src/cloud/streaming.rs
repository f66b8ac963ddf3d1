use std::io;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use log::{debug, info, warn};
use rusoto_core::ByteStream;
use rusoto_s3::{
    S3Client, S3,
    PutObjectRequest, CreateMultipartUploadRequest, UploadPartRequest, CompleteMultipartUploadRequest,
    CompletedPart, CompletedMultipartUpload, AbortMultipartUploadRequest
};
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tokio::time::Duration;

use crate::cloud::object_store::{ObjectLocation, ObjectStore, ReadStream};
use crate::constants::{MAX_UPLOAD_RETRIES, RETRY_BASE_DELAY_MS, S3_MAX_PARTS, S3_MIN_PART_SIZE, UPLOAD_QUEUE_DEPTH};
use crate::error::BackupError;

/// A part accepted by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedPart {
    pub part_number: i64,
    pub e_tag: String,
}

/// The S3 calls the streaming strategy needs.
#[async_trait]
pub trait UploadApi: Send + Sync + 'static {
    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<()>;

    /// Returns the upload ID.
    async fn create_multipart(&self, bucket: &str, key: &str) -> Result<String>;

    /// Returns the part's ETag.
    async fn upload_part(&self, bucket: &str, key: &str, upload_id: &str, part_number: i64, body: Bytes) -> Result<String>;

    /// Returns the object URL when the store reports one.
    async fn complete_multipart(&self, bucket: &str, key: &str, upload_id: &str, parts: Vec<UploadedPart>) -> Result<Option<String>>;

    async fn abort_multipart(&self, bucket: &str, key: &str, upload_id: &str) -> Result<()>;
}

/// [`UploadApi`] over a rusoto S3 client.
pub struct RusotoUploadApi {
    client: Arc<S3Client>,
}

impl RusotoUploadApi {
    pub fn new(client: Arc<S3Client>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UploadApi for RusotoUploadApi {
    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<()> {
        let request = PutObjectRequest {
            bucket: bucket.to_string(),
            key: key.to_string(),
            content_length: Some(body.len() as i64),
            body: Some(ByteStream::from(body.to_vec())),
            ..Default::default()
        };

        self.client.put_object(request).await
            .context("Failed to put object")?;
        Ok(())
    }

    async fn create_multipart(&self, bucket: &str, key: &str) -> Result<String> {
        let create_result = self.client.create_multipart_upload(CreateMultipartUploadRequest {
            bucket: bucket.to_string(),
            key: key.to_string(),
            ..Default::default()
        }).await.context("Failed to create multipart upload")?;

        create_result.upload_id
            .ok_or_else(|| anyhow!("No upload ID returned from S3"))
    }

    async fn upload_part(&self, bucket: &str, key: &str, upload_id: &str, part_number: i64, body: Bytes) -> Result<String> {
        let upload_part_request = UploadPartRequest {
            bucket: bucket.to_string(),
            key: key.to_string(),
            upload_id: upload_id.to_string(),
            part_number,
            content_length: Some(body.len() as i64),
            body: Some(ByteStream::from(body.to_vec())),
            ..Default::default()
        };

        let output = self.client.upload_part(upload_part_request).await
            .with_context(|| format!("Failed to upload part {}", part_number))?;

        output.e_tag
            .ok_or_else(|| anyhow!("No ETag in upload part response"))
    }

    async fn complete_multipart(&self, bucket: &str, key: &str, upload_id: &str, parts: Vec<UploadedPart>) -> Result<Option<String>> {
        let parts = parts.into_iter()
            .map(|part| CompletedPart {
                e_tag: Some(part.e_tag),
                part_number: Some(part.part_number),
            })
            .collect();

        let complete_request = CompleteMultipartUploadRequest {
            bucket: bucket.to_string(),
            key: key.to_string(),
            upload_id: upload_id.to_string(),
            multipart_upload: Some(CompletedMultipartUpload {
                parts: Some(parts),
            }),
            ..Default::default()
        };

        let output = self.client.complete_multipart_upload(complete_request).await
            .context("Failed to complete multipart upload")?;
        Ok(output.location)
    }

    async fn abort_multipart(&self, bucket: &str, key: &str, upload_id: &str) -> Result<()> {
        let abort_request = AbortMultipartUploadRequest {
            bucket: bucket.to_string(),
            key: key.to_string(),
            upload_id: upload_id.to_string(),
            ..Default::default()
        };

        self.client.abort_multipart_upload(abort_request).await
            .context("Failed to abort multipart upload")?;
        Ok(())
    }
}

struct UploadTask {
    data: Bytes,
    part_number: i64,
}

/// Uploads a stream of unknown length to S3.
///
/// The first part is buffered before anything is sent. If the stream ends
/// inside it, the object is written with a single PutObject. Otherwise a
/// multipart upload is started and every full part is handed to a background
/// task through a bounded channel, so at most `UPLOAD_QUEUE_DEPTH + 2` parts
/// are held in memory. The upload is completed only after the stream reports
/// a clean end; a read or part failure aborts it.
pub struct S3ObjectStore<A: UploadApi = RusotoUploadApi> {
    api: Arc<A>,
    part_size: usize,
}

impl S3ObjectStore<RusotoUploadApi> {
    /// Store backed by a real S3 client.
    pub fn from_client(client: Arc<S3Client>, part_size: usize) -> Self {
        Self::new(RusotoUploadApi::new(client), part_size.max(S3_MIN_PART_SIZE))
    }
}

impl<A: UploadApi> S3ObjectStore<A> {
    /// `part_size` is used as given; S3 itself rejects parts under 5MB.
    pub fn new(api: A, part_size: usize) -> Self {
        Self {
            api: Arc::new(api),
            part_size: part_size.max(1),
        }
    }

    pub fn part_size(&self) -> usize {
        self.part_size
    }

    async fn upload_parts(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        source: &mut ReadStream,
        first_part: Bytes,
        buffer: &mut BytesMut,
    ) -> std::result::Result<(Vec<UploadedPart>, u64), BackupError> {
        let (sender, mut receiver) = mpsc::channel::<UploadTask>(UPLOAD_QUEUE_DEPTH);

        let api = Arc::clone(&self.api);
        let bucket_clone = bucket.to_string();
        let key_clone = key.to_string();
        let upload_id_clone = upload_id.to_string();

        // Spawn background task to handle uploads
        let uploader = tokio::spawn(async move {
            let mut completed = Vec::new();
            while let Some(task) = receiver.recv().await {
                let e_tag = upload_part_with_retry(
                    api.as_ref(),
                    &bucket_clone,
                    &key_clone,
                    &upload_id_clone,
                    task.part_number,
                    task.data,
                ).await?;
                completed.push(UploadedPart { part_number: task.part_number, e_tag });
            }
            Ok::<_, anyhow::Error>(completed)
        });

        let mut next = Some(first_part);
        let mut part_number: i64 = 0;
        let mut total = 0u64;
        let mut eof = false;

        let read_result = loop {
            let data = match next.take() {
                Some(data) => data,
                None => break Ok(()),
            };

            part_number += 1;
            if part_number > S3_MAX_PARTS {
                break Err(BackupError::upload(format!(
                    "Snapshot exceeds {} parts of {} bytes",
                    S3_MAX_PARTS, self.part_size
                )));
            }

            total += data.len() as u64;
            if sender.send(UploadTask { data, part_number }).await.is_err() {
                // The uploader stopped; its own error is collected below.
                break Ok(());
            }

            if eof {
                break Ok(());
            }

            match fill_part(source, buffer, self.part_size).await {
                Ok(hit_eof) => {
                    eof = hit_eof;
                    if !buffer.is_empty() {
                        next = Some(buffer.split().freeze());
                    }
                }
                Err(e) => break Err(BackupError::upload(format!("Failed to read snapshot stream: {}", e))),
            }
        };

        drop(sender);

        if let Err(e) = read_result {
            uploader.abort();
            return Err(e);
        }

        let mut parts = match uploader.await {
            Ok(Ok(parts)) => parts,
            Ok(Err(e)) => return Err(BackupError::upload(format!("{:#}", e))),
            Err(e) => return Err(BackupError::upload(format!("Upload task failed: {}", e))),
        };

        parts.sort_by_key(|part| part.part_number);
        Ok((parts, total))
    }
}

#[async_trait]
impl<A: UploadApi> ObjectStore for S3ObjectStore<A> {
    async fn streaming_upload(&self, bucket: &str, key: &str, mut source: ReadStream) -> std::result::Result<ObjectLocation, BackupError> {
        let mut buffer = BytesMut::with_capacity(self.part_size);

        let eof = fill_part(&mut source, &mut buffer, self.part_size).await
            .map_err(|e| BackupError::upload(format!("Failed to read snapshot stream: {}", e)))?;

        if eof {
            let bytes = buffer.len() as u64;
            self.api.put_object(bucket, key, buffer.freeze()).await
                .map_err(|e| BackupError::upload(format!("{:#}", e)))?;

            debug!("Uploaded s3://{}/{} with a single request ({} bytes)", bucket, key, bytes);
            return Ok(ObjectLocation {
                bucket: bucket.to_string(),
                key: key.to_string(),
                location: None,
                bytes,
                parts: 0,
            });
        }

        let upload_id = self.api.create_multipart(bucket, key).await
            .map_err(|e| BackupError::upload(format!("{:#}", e)))?;

        debug!("Started multipart upload with ID: {} for {}", upload_id, key);

        let first_part = buffer.split().freeze();
        let outcome = match self.upload_parts(bucket, key, &upload_id, &mut source, first_part, &mut buffer).await {
            Ok((parts, bytes)) => {
                let count = parts.len();
                self.api.complete_multipart(bucket, key, &upload_id, parts).await
                    .map(|location| (location, bytes, count))
                    .map_err(|e| BackupError::upload(format!("{:#}", e)))
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok((location, bytes, parts)) => {
                info!("Completed multipart upload for {} ({} parts, {} bytes)", key, parts, bytes);
                Ok(ObjectLocation {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    location,
                    bytes,
                    parts,
                })
            }
            Err(e) => {
                // Try to abort the upload to clean up
                warn!("Attempting to abort the failed upload...");
                match self.api.abort_multipart(bucket, key, &upload_id).await {
                    Ok(()) => warn!("Successfully aborted the failed upload"),
                    Err(abort_err) => warn!("Failed to abort upload: {:#}", abort_err),
                }
                Err(e)
            }
        }
    }
}

/// Read until `buffer` holds `part_size` bytes or the stream ends.
/// Returns true when the end of the stream was reached.
async fn fill_part(source: &mut ReadStream, buffer: &mut BytesMut, part_size: usize) -> io::Result<bool> {
    while buffer.len() < part_size {
        let remaining = part_size - buffer.len();
        buffer.reserve(remaining);
        if (&mut *source).take(remaining as u64).read_buf(buffer).await? == 0 {
            return Ok(true);
        }
    }
    Ok(false)
}

async fn upload_part_with_retry<A: UploadApi + ?Sized>(
    api: &A,
    bucket: &str,
    key: &str,
    upload_id: &str,
    part_number: i64,
    data: Bytes,
) -> Result<String> {
    let mut attempts = 0;

    loop {
        attempts += 1;

        match api.upload_part(bucket, key, upload_id, part_number, data.clone()).await {
            Ok(e_tag) => return Ok(e_tag),
            Err(e) => {
                if attempts >= MAX_UPLOAD_RETRIES {
                    return Err(anyhow!("Failed to upload part {} after {} attempts: {:#}",
                                       part_number, MAX_UPLOAD_RETRIES, e));
                }

                let delay = Duration::from_millis(RETRY_BASE_DELAY_MS * 2u64.pow(attempts as u32));
                warn!("Part {} upload attempt {} failed, retrying in {:?}: {:#}",
                      part_number, attempts, delay, e);
                tokio::time::sleep(delay).await;
            }
        }
    }
}
