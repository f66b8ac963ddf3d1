//! Global constants for vault-backup.
//!
//! Defaults, limits and environment variable names live here so the
//! configuration layer and the tests agree on them.

// Authentication
/// Authentication mode selector value for token auth
pub const AUTH_MODE_TOKEN: &str = "token";

/// Authentication mode selector value for Kubernetes service account auth
pub const AUTH_MODE_KUBERNETES: &str = "kubernetes";

/// Default location of the projected service account token
pub const DEFAULT_SERVICE_ACCOUNT_TOKEN_PATH: &str =
    "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// File name of the token inside a service account directory
pub const SERVICE_ACCOUNT_TOKEN_FILE: &str = "token";

/// Default mount of the Kubernetes auth method
pub const DEFAULT_KUBERNETES_AUTH_MOUNT: &str = "kubernetes";

// Vault
/// Default KV v2 mount holding the destination credentials
pub const DEFAULT_SECRET_MOUNT: &str = "secret";

/// Default Vault address when VAULT_ADDR is not set
pub const DEFAULT_VAULT_ADDR: &str = "https://127.0.0.1:8200";

/// Default timeout for login and KV requests (seconds)
pub const DEFAULT_VAULT_TIMEOUT_SECS: u64 = 60;

/// Raft snapshot endpoint, relative to the Vault address
pub const RAFT_SNAPSHOT_PATH: &str = "/v1/sys/storage/raft/snapshot";

// Transfer
/// Default conduit capacity between snapshot export and upload (1MB)
pub const DEFAULT_CONDUIT_CAPACITY: usize = 1024 * 1024;

/// S3 minimum part size for multipart uploads (5MB)
pub const S3_MIN_PART_SIZE: usize = 5 * 1024 * 1024;

/// S3 maximum parts per upload
pub const S3_MAX_PARTS: i64 = 10000;

/// Number of finished parts that may queue for the background uploader
pub const UPLOAD_QUEUE_DEPTH: usize = 2;

/// Maximum attempts for a single part request
pub const MAX_UPLOAD_RETRIES: usize = 3;

/// Base retry delay in milliseconds
pub const RETRY_BASE_DELAY_MS: u64 = 250;

/// Progress reporting interval in seconds
pub const PROGRESS_REPORT_INTERVAL_SECS: u64 = 5;

// Naming
/// chrono format string for snapshot object keys
pub const SNAPSHOT_KEY_FORMAT: &str = "%Y_%m_%d__%H_%M.raft";

// Environment variables
pub const ENV_VAULT_ADDR: &str = "VAULT_ADDR";
pub const ENV_VAULT_TOKEN: &str = "VAULT_TOKEN";
pub const ENV_VAULT_ROLE: &str = "VAULT_ROLE";
pub const ENV_VAULT_NAMESPACE: &str = "VAULT_NAMESPACE";
pub const ENV_VAULT_CACERT: &str = "VAULT_CACERT";
pub const ENV_VAULT_SKIP_VERIFY: &str = "VAULT_SKIP_VERIFY";
pub const ENV_VAULT_CLIENT_TIMEOUT: &str = "VAULT_CLIENT_TIMEOUT";
pub const ENV_AWS_BUCKET: &str = "AWS_BUCKET";
pub const ENV_AWS_ENDPOINT: &str = "AWS_ENDPOINT";
pub const ENV_AWS_PATHSTYLE: &str = "AWS_PATHSTYLE";
pub const ENV_AWS_REGION: &str = "AWS_REGION";
pub const ENV_AWS_DEFAULT_REGION: &str = "AWS_DEFAULT_REGION";
pub const ENV_AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const ENV_AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const ENV_AWS_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";
