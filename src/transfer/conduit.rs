//! Bounded in-memory byte pipe between the snapshot export and the upload.
//!
//! [`byte_conduit`] returns a single writer and a single reader. Neither half
//! is `Clone`, so the pipe cannot gain extra producers or consumers.
//!
//! Only [`ConduitWriter::close`] produces a clean end-of-stream. If the writer
//! is aborted or dropped without `close`, the reader gets an I/O error once the
//! buffered bytes are drained instead of EOF. An upload reading from the conduit
//! therefore never finalizes a truncated snapshot.

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, DuplexStream, ReadBuf};

/// Shared view of a conduit, readable while the transfer runs.
#[derive(Debug, Default)]
pub struct ConduitState {
    bytes_written: AtomicU64,
    bytes_read: AtomicU64,
    closed: AtomicBool,
    reader_abandoned: AtomicBool,
    abort_reason: Mutex<Option<String>>,
}

impl ConduitState {
    /// Bytes accepted from the producer so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::SeqCst)
    }

    /// Bytes handed to the consumer so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read.load(Ordering::SeqCst)
    }

    /// Whether the writer signalled a clean end-of-stream.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Why the writer ended without a clean close, if it did.
    pub fn abort_reason(&self) -> Option<String> {
        self.abort_reason
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// True when the reader was dropped before it saw the end of the stream.
    pub fn reader_abandoned(&self) -> bool {
        self.reader_abandoned.load(Ordering::SeqCst)
    }

    fn set_abort(&self, reason: String) {
        let mut slot = self.abort_reason.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.is_none() {
            *slot = Some(reason);
        }
    }
}

/// Create a conduit holding at most `capacity` unread bytes.
pub fn byte_conduit(capacity: usize) -> (ConduitWriter, ConduitReader) {
    let (write_end, read_end) = tokio::io::duplex(capacity.max(1));
    let state = Arc::new(ConduitState::default());

    let writer = ConduitWriter {
        inner: Some(write_end),
        state: Arc::clone(&state),
    };
    let reader = ConduitReader {
        inner: read_end,
        state,
        finished: false,
    };

    (writer, reader)
}

/// Write end of the conduit.
///
/// `poll_shutdown` only flushes; the end-of-stream signal is reserved for
/// [`close`](Self::close) so a sink user cannot end the stream early.
#[derive(Debug)]
pub struct ConduitWriter {
    inner: Option<DuplexStream>,
    state: Arc<ConduitState>,
}

impl ConduitWriter {
    pub fn state(&self) -> Arc<ConduitState> {
        Arc::clone(&self.state)
    }

    /// Signal a clean end-of-stream. The reader sees EOF after draining
    /// everything written before this call.
    pub async fn close(mut self) -> io::Result<()> {
        if let Some(mut inner) = self.inner.take() {
            self.state.closed.store(true, Ordering::SeqCst);
            inner.shutdown().await?;
        }
        Ok(())
    }

    /// End the stream with an error. The reader fails instead of seeing EOF.
    pub fn abort(mut self, reason: impl Into<String>) {
        self.state.set_abort(reason.into());
        self.inner.take();
    }

    fn inner_mut(&mut self) -> io::Result<&mut DuplexStream> {
        self.inner
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "conduit write end already closed"))
    }
}

impl Drop for ConduitWriter {
    fn drop(&mut self) {
        // The abort reason must be visible before the duplex half goes away,
        // otherwise the reader could observe a clean EOF first.
        if self.inner.is_some() {
            self.state.set_abort("conduit write end dropped before close".to_string());
            self.inner.take();
        }
    }
}

impl AsyncWrite for ConduitWriter {
    fn poll_write(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        let state = Arc::clone(&self.state);
        let inner = match self.inner_mut() {
            Ok(inner) => inner,
            Err(e) => return Poll::Ready(Err(e)),
        };

        match Pin::new(inner).poll_write(cx, buf) {
            Poll::Ready(Ok(n)) => {
                state.bytes_written.fetch_add(n as u64, Ordering::SeqCst);
                Poll::Ready(Ok(n))
            }
            other => other,
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.inner.as_mut() {
            Some(inner) => Pin::new(inner).poll_flush(cx),
            None => Poll::Ready(Ok(())),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.poll_flush(cx)
    }
}

/// Read end of the conduit.
#[derive(Debug)]
pub struct ConduitReader {
    inner: DuplexStream,
    state: Arc<ConduitState>,
    finished: bool,
}

impl ConduitReader {
    pub fn state(&self) -> Arc<ConduitState> {
        Arc::clone(&self.state)
    }
}

impl Drop for ConduitReader {
    fn drop(&mut self) {
        if !self.finished {
            self.state.reader_abandoned.store(true, Ordering::SeqCst);
        }
    }
}

impl AsyncRead for ConduitReader {
    fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        let asked = buf.remaining() > 0;

        match Pin::new(&mut self.inner).poll_read(cx, buf) {
            Poll::Ready(Ok(())) => {
                let n = buf.filled().len() - before;
                if n > 0 || !asked {
                    self.state.bytes_read.fetch_add(n as u64, Ordering::SeqCst);
                    return Poll::Ready(Ok(()));
                }

                // Zero bytes with room in the buffer: the write end is gone.
                self.finished = true;
                match self.state.abort_reason() {
                    Some(reason) => Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, reason))),
                    None => Poll::Ready(Ok(())),
                }
            }
            Poll::Ready(Err(e)) => {
                self.finished = true;
                Poll::Ready(Err(e))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
