use std::path::PathBuf;
use std::time::Duration;

use crate::config::AmbientConfig;
use crate::constants::*;
use crate::error::{BackupError, Result};

/// Parse a boolean the lenient way operators expect from shell variables.
///
/// Accepts `1 t T TRUE true True` and `0 f F FALSE false False`; anything
/// else is `None`.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Parse a duration such as `30s`, `1m`, `2h` or `500ms`. A bare number is
/// seconds.
pub fn parse_duration(raw: &str) -> std::result::Result<Duration, String> {
    let s = raw.trim();
    let invalid = || format!("invalid duration '{}'", raw);

    let (number, unit_ms) = if let Some(stripped) = s.strip_suffix("ms") {
        (stripped, 1)
    } else if let Some(stripped) = s.strip_suffix('s') {
        (stripped, 1_000)
    } else if let Some(stripped) = s.strip_suffix('m') {
        (stripped, 60_000)
    } else if let Some(stripped) = s.strip_suffix('h') {
        (stripped, 3_600_000)
    } else {
        (s, 1_000)
    };

    let value: u64 = number.trim().parse().map_err(|_| invalid())?;
    value
        .checked_mul(unit_ms)
        .map(Duration::from_millis)
        .ok_or_else(invalid)
}

/// Connection settings for the Vault server.
#[derive(Debug, Clone, PartialEq)]
pub struct VaultSettings {
    pub address: String,
    pub namespace: Option<String>,
    pub ca_cert: Option<PathBuf>,
    pub skip_verify: bool,
    /// Applies to login and KV reads. `None` means no deadline; the snapshot
    /// stream never has one.
    pub timeout: Option<Duration>,
}

impl VaultSettings {
    pub fn from_ambient(ambient: &AmbientConfig) -> Result<Self> {
        let address = ambient
            .get(ENV_VAULT_ADDR)
            .unwrap_or(DEFAULT_VAULT_ADDR)
            .trim_end_matches('/')
            .to_string();

        let timeout = match ambient.get(ENV_VAULT_CLIENT_TIMEOUT) {
            Some(raw) => parse_duration(raw).map_err(|e| {
                BackupError::config(format!("{}: {}", ENV_VAULT_CLIENT_TIMEOUT, e))
            })?,
            None => Duration::from_secs(DEFAULT_VAULT_TIMEOUT_SECS),
        };

        Ok(Self {
            address,
            namespace: ambient.get_owned(ENV_VAULT_NAMESPACE),
            ca_cert: ambient.get(ENV_VAULT_CACERT).map(PathBuf::from),
            skip_verify: ambient.get(ENV_VAULT_SKIP_VERIFY).and_then(parse_bool).unwrap_or(false),
            timeout: Some(timeout).filter(|t| !t.is_zero()),
        })
    }

    /// Full URL of the raft snapshot endpoint.
    pub fn snapshot_url(&self) -> String {
        format!("{}{}", self.address, RAFT_SNAPSHOT_PATH)
    }
}

/// Static AWS credentials injected through the ambient configuration.
#[derive(Clone, PartialEq)]
pub struct StaticCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field("session_token", &self.session_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Destination settings, read after secrets have been materialized.
#[derive(Debug, Clone, PartialEq)]
pub struct S3Settings {
    pub bucket: String,
    pub endpoint: Option<String>,
    pub path_style: bool,
    pub region: Option<String>,
    pub credentials: Option<StaticCredentials>,
}

impl S3Settings {
    pub fn from_ambient(ambient: &AmbientConfig) -> Result<Self> {
        let bucket = require_bucket(ambient)?;

        let credentials = match (ambient.get(ENV_AWS_ACCESS_KEY_ID), ambient.get(ENV_AWS_SECRET_ACCESS_KEY)) {
            (Some(id), Some(secret)) => Some(StaticCredentials {
                access_key_id: id.to_string(),
                secret_access_key: secret.to_string(),
                session_token: ambient.get_owned(ENV_AWS_SESSION_TOKEN),
            }),
            _ => None,
        };

        Ok(Self {
            bucket,
            endpoint: ambient.get_owned(ENV_AWS_ENDPOINT),
            path_style: ambient.get(ENV_AWS_PATHSTYLE).and_then(parse_bool).unwrap_or(false),
            region: ambient
                .get_owned(ENV_AWS_REGION)
                .or_else(|| ambient.get_owned(ENV_AWS_DEFAULT_REGION)),
            credentials,
        })
    }
}

/// The destination bucket, or a configuration error naming the variable.
pub fn require_bucket(ambient: &AmbientConfig) -> Result<String> {
    ambient
        .get_owned(ENV_AWS_BUCKET)
        .ok_or_else(|| BackupError::config(format!("'{}' not set", ENV_AWS_BUCKET)))
}

/// Buffer sizing for the transfer pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferSettings {
    /// Bytes the conduit holds before the snapshot export blocks
    pub conduit_capacity: usize,
    /// Bytes per multipart part
    pub part_size: usize,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            conduit_capacity: DEFAULT_CONDUIT_CAPACITY,
            part_size: S3_MIN_PART_SIZE,
        }
    }
}

impl TransferSettings {
    /// Build from the CLI units (KiB for the conduit, MiB for parts).
    pub fn from_cli(buffer_size_kib: usize, part_size_mib: usize) -> Result<Self> {
        if buffer_size_kib == 0 {
            return Err(BackupError::config("--bufferSize must be greater than zero"));
        }
        let part_size = part_size_mib.saturating_mul(1024 * 1024);
        if part_size < S3_MIN_PART_SIZE {
            return Err(BackupError::config(format!(
                "--partSize must be at least {}MB, got {}MB",
                S3_MIN_PART_SIZE / (1024 * 1024),
                part_size_mib
            )));
        }
        Ok(Self {
            conduit_capacity: buffer_size_kib.saturating_mul(1024),
            part_size,
        })
    }
}
