use clap::Parser;
use std::path::PathBuf;

use crate::constants::{
    AUTH_MODE_TOKEN, DEFAULT_KUBERNETES_AUTH_MOUNT, DEFAULT_SECRET_MOUNT, DEFAULT_SERVICE_ACCOUNT_TOKEN_PATH,
};
use crate::vault::auth::AuthOptions;
use crate::vault::secrets::SecretLocation;

/// Command-line arguments for vault-backup.
///
/// Flag names follow the camelCase spelling operators already use in their
/// job manifests. Everything else (Vault address, bucket, AWS credentials)
/// comes from the environment or from the secret named by `--secret`.
#[derive(Parser, Debug)]
#[clap(name = "vault-backup", about = "Stream a Vault raft snapshot to S3")]
pub struct Args {
    /// Authentication mode: token or kubernetes
    #[clap(long = "authMode", default_value = AUTH_MODE_TOKEN)]
    pub auth_mode: String,

    /// Service account token file, or the directory holding it
    #[clap(long = "kubernetesServiceAccountPath", default_value = DEFAULT_SERVICE_ACCOUNT_TOKEN_PATH)]
    pub kubernetes_service_account_path: PathBuf,

    /// Mount of the Kubernetes auth method
    #[clap(long = "kubernetesAuthMount", default_value = DEFAULT_KUBERNETES_AUTH_MOUNT)]
    pub kubernetes_auth_mount: String,

    /// KV v2 mount of the secret holding destination settings
    #[clap(long = "mount", default_value = DEFAULT_SECRET_MOUNT)]
    pub mount: String,

    /// Secret path whose string fields are exported as environment settings
    #[clap(long = "secret", default_value = "")]
    pub secret: String,

    /// Transfer buffer between Vault and S3 (in KB)
    #[clap(long = "bufferSize", default_value = "1024")]
    pub buffer_size: usize,

    /// Multipart upload part size (in MB, minimum 5)
    #[clap(long = "partSize", default_value = "5")]
    pub part_size: usize,

    /// Verbose logging
    #[clap(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn auth_options(&self) -> AuthOptions {
        AuthOptions {
            mode: self.auth_mode.clone(),
            service_account_token_path: self.kubernetes_service_account_path.clone(),
            kubernetes_mount: self.kubernetes_auth_mount.clone(),
        }
    }

    pub fn secret_location(&self) -> SecretLocation {
        SecretLocation::new(self.mount.clone(), self.secret.clone())
    }
}
