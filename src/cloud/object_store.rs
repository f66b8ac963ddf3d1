use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::error::Result;

/// Source handed to an upload. Its total length is not known in advance.
pub type ReadStream = Box<dyn AsyncRead + Send + Unpin>;

/// Where a finished upload landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
    /// URL reported by the store, when it reports one
    pub location: Option<String>,
    pub bytes: u64,
    /// 0 for a single PutObject
    pub parts: usize,
}

impl ObjectLocation {
    /// `s3://bucket/key` form used in log lines.
    pub fn uri(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }
}

/// Destination side of the transfer.
///
/// Implementations read `source` until end-of-stream and only then finalize
/// the object. A read error must leave no object behind.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn streaming_upload(&self, bucket: &str, key: &str, source: ReadStream) -> Result<ObjectLocation>;
}
