use std::sync::Arc;
use std::time::{Duration, Instant};

use log::info;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::transfer::conduit::ConduitState;

/// Periodic progress logging for a transfer whose size is unknown up front.
pub struct ProgressTracker {
    state: Arc<ConduitState>,
    interval: Duration,
    start_time: Instant,
}

impl ProgressTracker {
    pub fn new(state: Arc<ConduitState>, interval: Duration) -> Self {
        Self {
            state,
            interval,
            start_time: Instant::now(),
        }
    }

    /// Log throughput every interval until the stream ends. The handle can be
    /// aborted early; it also exits on its own once the conduit is drained.
    pub fn start_tracking(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut last_reported = 0u64;

            loop {
                sleep(self.interval).await;

                let transferred = self.state.bytes_read();
                if transferred != last_reported {
                    info!(
                        "Snapshot transfer progress: {} bytes ({:.2} MB/s)",
                        transferred,
                        throughput_mb_per_sec(transferred, self.start_time.elapsed())
                    );
                    last_reported = transferred;
                }

                if self.state.is_closed() || self.state.abort_reason().is_some() {
                    break;
                }
            }
        })
    }
}

/// Megabytes per second, zero for an empty interval.
pub fn throughput_mb_per_sec(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        bytes as f64 / secs / 1024.0 / 1024.0
    } else {
        0.0
    }
}
