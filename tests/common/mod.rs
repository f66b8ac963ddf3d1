//! Shared in-memory fakes for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncWriteExt;

use vault_backup::cloud::streaming::{UploadApi, UploadedPart};
use vault_backup::vault::{SecretBundle, SecretReader, Session, SnapshotSource, WriteStream};

/// Deterministic payload of `len` bytes.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Snapshot source that writes `data` in fixed-size chunks.
pub struct ChunkedSnapshot {
    pub data: Vec<u8>,
    pub chunk_size: usize,
}

impl ChunkedSnapshot {
    pub fn new(data: Vec<u8>, chunk_size: usize) -> Self {
        Self { data, chunk_size }
    }
}

#[async_trait]
impl SnapshotSource for ChunkedSnapshot {
    async fn export_snapshot(&self, _session: &Session, sink: &mut WriteStream) -> Result<u64> {
        for chunk in self.data.chunks(self.chunk_size.max(1)) {
            sink.write_all(chunk).await?;
        }
        sink.flush().await?;
        Ok(self.data.len() as u64)
    }
}

/// Writes `prefix` and then fails.
pub struct FailingSnapshot {
    pub prefix: Vec<u8>,
    pub message: String,
}

#[async_trait]
impl SnapshotSource for FailingSnapshot {
    async fn export_snapshot(&self, _session: &Session, sink: &mut WriteStream) -> Result<u64> {
        sink.write_all(&self.prefix).await?;
        bail!("{}", self.message)
    }
}

/// Writes `prefix` and then panics.
pub struct PanickingSnapshot {
    pub prefix: Vec<u8>,
}

#[async_trait]
impl SnapshotSource for PanickingSnapshot {
    async fn export_snapshot(&self, _session: &Session, sink: &mut WriteStream) -> Result<u64> {
        sink.write_all(&self.prefix).await?;
        panic!("raft snapshot reader crashed");
    }
}

#[derive(Default)]
pub struct UploadState {
    pub objects: HashMap<String, Vec<u8>>,
    pub pending: HashMap<String, Vec<(i64, Bytes)>>,
    pub calls: Vec<String>,
    pub fail_create: bool,
    pub fail_complete: bool,
}

/// In-memory S3. An object appears in `objects` only once it is finalized.
#[derive(Default, Clone)]
pub struct MemoryUploadApi {
    pub state: Arc<Mutex<UploadState>>,
}

impl MemoryUploadApi {
    pub fn failing_create() -> Self {
        let api = Self::default();
        api.state.lock().unwrap().fail_create = true;
        api
    }

    pub fn failing_complete() -> Self {
        let api = Self::default();
        api.state.lock().unwrap().fail_complete = true;
        api
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.state.lock().unwrap().objects.get(key).cloned()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn called(&self, prefix: &str) -> bool {
        self.calls().iter().any(|c| c.starts_with(prefix))
    }
}

#[async_trait]
impl UploadApi for MemoryUploadApi {
    async fn put_object(&self, _bucket: &str, key: &str, body: Bytes) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("put".to_string());
        state.objects.insert(key.to_string(), body.to_vec());
        Ok(())
    }

    async fn create_multipart(&self, _bucket: &str, key: &str) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("create".to_string());
        if state.fail_create {
            return Err(anyhow!("AccessDenied: bucket policy forbids uploads"));
        }
        state.pending.insert(key.to_string(), Vec::new());
        Ok("upload-1".to_string())
    }

    async fn upload_part(&self, _bucket: &str, key: &str, _upload_id: &str, part_number: i64, body: Bytes) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("part{}", part_number));
        state.pending.entry(key.to_string()).or_default().push((part_number, body));
        Ok(format!("etag-{}", part_number))
    }

    async fn complete_multipart(&self, _bucket: &str, key: &str, _upload_id: &str, parts: Vec<UploadedPart>) -> Result<Option<String>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("complete".to_string());
        if state.fail_complete {
            return Err(anyhow!("InternalError: please retry"));
        }
        let mut uploaded = state.pending.remove(key).unwrap_or_default();
        uploaded.sort_by_key(|(n, _)| *n);
        assert_eq!(parts.len(), uploaded.len());
        let data = uploaded.into_iter().flat_map(|(_, b)| b.to_vec()).collect();
        state.objects.insert(key.to_string(), data);
        Ok(None)
    }

    async fn abort_multipart(&self, _bucket: &str, key: &str, _upload_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("abort".to_string());
        state.pending.remove(key);
        Ok(())
    }
}

/// KV reader returning a fixed bundle for one path.
pub struct StaticSecretReader {
    pub mount: String,
    pub path: String,
    pub bundle: SecretBundle,
}

#[async_trait]
impl SecretReader for StaticSecretReader {
    async fn read_secret(&self, _session: &Session, mount: &str, path: &str) -> Result<SecretBundle> {
        if mount == self.mount && path == self.path {
            Ok(self.bundle.clone())
        } else {
            bail!("Code: 404. Errors:")
        }
    }
}
