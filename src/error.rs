//! Error taxonomy for a backup run.
//!
//! Every failure in the run maps onto exactly one of these variants. None of
//! them are recovered locally: the caller logs the error and terminates.

use thiserror::Error;

/// Result type used at component boundaries.
pub type Result<T> = std::result::Result<T, BackupError>;

/// Errors that end a backup run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackupError {
    /// Missing or invalid configuration, detected before any network call.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The authentication handshake failed or produced no usable session.
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    /// The session is valid but the secret could not be read.
    #[error("Unable to read Vault secret: {message}")]
    SecretFetch { message: String },

    /// Reading the snapshot from Vault failed.
    #[error("Unable to read snapshot from Vault: {message}")]
    Export { message: String },

    /// Writing the snapshot to object storage failed.
    #[error("Failed to upload snapshot: {message}")]
    Upload { message: String },
}

impl BackupError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    /// Create an authentication error.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth { message: message.into() }
    }

    /// Create a secret fetch error.
    pub fn secret_fetch(message: impl Into<String>) -> Self {
        Self::SecretFetch { message: message.into() }
    }

    /// Create a snapshot export error.
    pub fn export(message: impl Into<String>) -> Self {
        Self::Export { message: message.into() }
    }

    /// Create an upload error.
    pub fn upload(message: impl Into<String>) -> Self {
        Self::Upload { message: message.into() }
    }

    /// Short label for the failure kind, used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::Auth { .. } => "auth",
            Self::SecretFetch { .. } => "secret_fetch",
            Self::Export { .. } => "export",
            Self::Upload { .. } => "upload",
        }
    }
}
