//! Object storage destination for snapshots.
//!
//! The transfer pipeline only sees the [`object_store::ObjectStore`] trait.
//! [`streaming::S3ObjectStore`] implements it for S3 and S3-compatible
//! services such as MinIO.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐
//! │  Conduit reader │────▶│  S3ObjectStore  │
//! └─────────────────┘     └────────┬────────┘
//!                                  │ first part short?
//!                    ┌─────────────┴─────────────┐
//!                    │ yes                       │ no
//!              ┌─────▼──────┐           ┌───────▼────────┐
//!              │ PutObject  │           │ Multipart      │
//!              │            │           │ (bg uploader)  │
//!              └─────┬──────┘           └───────┬────────┘
//!                    │                           │
//!                    └──────────┬────────────────┘
//!                         ┌─────▼──────┐
//!                         │  S3 Bucket │
//!                         └────────────┘
//! ```

/// Destination trait and upload result
pub mod object_store;

/// S3 streaming upload implementation
pub mod streaming;

/// S3 client construction
pub mod client;
