//! # vault-backup
//!
//! Takes a raft snapshot of a HashiCorp Vault cluster and streams it straight
//! into S3 or an S3-compatible store, without staging the snapshot on disk or
//! holding it in memory.
//!
//! ## Overview
//!
//! A run goes through four steps:
//!
//! 1. **Authenticate** against Vault with a token or a Kubernetes service
//!    account ([`vault::auth`]).
//! 2. **Materialize** destination settings from an optional KV v2 secret into
//!    the [`config::AmbientConfig`] overlay ([`vault::secrets`]).
//! 3. **Name** the object after the local wall clock ([`naming`]).
//! 4. **Transfer** the snapshot through a bounded in-memory conduit into a
//!    multipart upload ([`transfer`], [`cloud`]).
//!
//! Every failure is fatal and maps to one [`error::BackupError`] variant.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use vault_backup::cloud::streaming::S3ObjectStore;
//! use vault_backup::config::{AmbientConfig, S3Settings, TransferSettings, VaultSettings};
//! use vault_backup::transfer::{run_transfer, TransferJob};
//! use vault_backup::vault::client::VaultStore;
//! use vault_backup::vault::Session;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let ambient = AmbientConfig::from_env();
//! let vault = Arc::new(VaultStore::new(VaultSettings::from_ambient(&ambient)?)?);
//! let s3 = S3Settings::from_ambient(&ambient)?;
//! let client = vault_backup::cloud::client::create_s3_client(&s3)?;
//! let settings = TransferSettings::default();
//! let store = S3ObjectStore::from_client(client, settings.part_size);
//!
//! let job = TransferJob::new(s3.bucket, vault_backup::naming::current_snapshot_key());
//! let report = run_transfer(vault, Session::from_token("hvs.example"), &store, &job, settings).await?;
//! println!("uploaded {} bytes", report.location.bytes);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`cli`]: Command-line interface definitions and argument parsing
//! - [`config`]: Ambient configuration overlay and typed settings
//! - [`vault`]: Authentication, secret materialization and snapshot export
//! - [`transfer`]: Conduit, progress reporting and producer/consumer pipeline
//! - [`cloud`]: S3 client and streaming multipart upload
//! - [`naming`]: Snapshot object keys
//! - [`security`]: Credential scrubbing for log output
//! - [`error`]: Error taxonomy
//! - [`constants`]: Application-wide constants

/// Command-line interface definitions and argument parsing
pub mod cli;

/// Ambient configuration overlay and typed settings
pub mod config;

/// Application constants and configuration values
pub mod constants;

/// Error taxonomy for a backup run
pub mod error;

/// Vault authentication, secrets and snapshot export
pub mod vault;

/// Streaming transfer pipeline
pub mod transfer;

/// Object storage destination (S3)
pub mod cloud;

/// Snapshot object naming
pub mod naming;

/// Security utilities for credential protection
pub mod security;
