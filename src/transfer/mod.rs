//! Streaming transfer from the snapshot export into object storage.
//!
//! ```text
//! ┌──────────────┐  write   ┌──────────────┐  read   ┌──────────────┐
//! │ SnapshotSource│────────▶│ ByteConduit  │────────▶│ ObjectStore  │
//! │ (spawned task)│         │ (bounded)    │         │ (caller task)│
//! └──────────────┘          └──────────────┘         └──────────────┘
//! ```
//!
//! The whole snapshot is never held in memory: the producer blocks once the
//! conduit is full and the consumer blocks while it is empty.

/// Bounded single-producer single-consumer byte pipe
pub mod conduit;

/// Periodic transfer progress logging
pub mod progress;

/// Producer/consumer orchestration
pub mod pipeline;

pub use conduit::{byte_conduit, ConduitReader, ConduitState, ConduitWriter};
pub use pipeline::{run_transfer, TransferJob, TransferReport};
