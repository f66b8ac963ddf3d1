//! Vault backend for the capability traits.
//!
//! Login and KV reads go through `vaultrs`. The raft snapshot endpoint
//! returns a raw binary body that `vaultrs` does not expose, so it is read
//! with a streaming `reqwest` GET and copied chunk by chunk into the sink.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use log::{debug, info};
use tokio::io::AsyncWriteExt;
use vaultrs::client::{VaultClient, VaultClientSettingsBuilder};
use vaultrs::error::ClientError;
use vaultrs::kv2;

use crate::config::VaultSettings;
use crate::error::BackupError;
use crate::vault::{AuthBackend, LoginResponse, SecretBundle, SecretReader, Session, SnapshotSource, WriteStream};

const VAULT_TOKEN_HEADER: &str = "X-Vault-Token";
const VAULT_NAMESPACE_HEADER: &str = "X-Vault-Namespace";

/// A Vault server reached over HTTP(S).
pub struct VaultStore {
    settings: VaultSettings,
    http: reqwest::Client,
}

impl VaultStore {
    /// Build the store. Fails with a configuration error when the CA bundle
    /// cannot be loaded.
    pub fn new(settings: VaultSettings) -> crate::error::Result<Self> {
        let mut builder = reqwest::Client::builder().danger_accept_invalid_certs(settings.skip_verify);

        if let Some(ca_path) = &settings.ca_cert {
            let pem = std::fs::read(ca_path).map_err(|e| {
                BackupError::config(format!("Unable to read VAULT_CACERT {}: {}", ca_path.display(), e))
            })?;
            let cert = reqwest::Certificate::from_pem(&pem).map_err(|e| {
                BackupError::config(format!("Invalid certificate in {}: {}", ca_path.display(), e))
            })?;
            builder = builder.add_root_certificate(cert);
        }

        let http = builder
            .build()
            .map_err(|e| BackupError::config(format!("Unable to initialize Vault client: {}", e)))?;

        debug!("Vault client configured for {}", settings.address);
        Ok(Self { settings, http })
    }

    pub fn settings(&self) -> &VaultSettings {
        &self.settings
    }

    /// Create a vaultrs client, optionally bound to a session token.
    fn vault_client(&self, token: Option<&str>) -> Result<VaultClient> {
        let mut builder = VaultClientSettingsBuilder::default();
        builder.address(&self.settings.address);
        builder.timeout(self.settings.timeout);
        builder.verify(!self.settings.skip_verify);

        if let Some(namespace) = &self.settings.namespace {
            builder.namespace(Some(namespace.clone()));
        }

        if let Some(ca_path) = &self.settings.ca_cert {
            builder.ca_certs(vec![ca_path.to_string_lossy().into_owned()]);
        }

        if let Some(token) = token {
            builder.token(token);
        }

        let settings = builder
            .build()
            .map_err(|e| anyhow!("Invalid Vault configuration: {}", e))?;

        VaultClient::new(settings).map_err(|e| anyhow!("Failed to create Vault client: {}", e))
    }
}

#[async_trait]
impl AuthBackend for VaultStore {
    async fn login_kubernetes(&self, mount: &str, role: &str, jwt: &str) -> Result<Option<LoginResponse>> {
        let client = self.vault_client(None)?;

        match vaultrs::auth::kubernetes::login(&client, mount, role, jwt).await {
            Ok(auth) => Ok(Some(LoginResponse {
                client_token: auth.client_token,
                accessor: auth.accessor,
                policies: auth.policies,
                lease_duration: auth.lease_duration,
                renewable: auth.renewable,
            })),
            Err(ClientError::ResponseEmptyError) => Ok(None),
            Err(e) => Err(e).context(format!("Login at auth/{} failed", mount)),
        }
    }
}

#[async_trait]
impl SecretReader for VaultStore {
    async fn read_secret(&self, session: &Session, mount: &str, path: &str) -> Result<SecretBundle> {
        let client = self.vault_client(Some(session.token()))?;

        let bundle = kv2::read::<SecretBundle>(&client, mount, path)
            .await
            .with_context(|| format!("Failed to read {}/{}", mount, path))?;

        debug!("Read {} fields from {}/{}", bundle.len(), mount, path);
        Ok(bundle)
    }
}

#[async_trait]
impl SnapshotSource for VaultStore {
    async fn export_snapshot(&self, session: &Session, sink: &mut WriteStream) -> Result<u64> {
        let mut request = self
            .http
            .get(self.settings.snapshot_url())
            .header(VAULT_TOKEN_HEADER, session.token());

        if let Some(namespace) = &self.settings.namespace {
            request = request.header(VAULT_NAMESPACE_HEADER, namespace);
        }

        let response = request.send().await.context("Snapshot request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Vault returned {}: {}", status, body.trim());
        }

        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("Snapshot stream interrupted")?;
            sink.write_all(&chunk)
                .await
                .context("Failed to write snapshot into transfer buffer")?;
            written += chunk.len() as u64;
        }

        sink.flush().await.context("Failed to flush snapshot")?;

        info!("Vault snapshot created ({} bytes)", written);
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AmbientConfig;
    use std::path::PathBuf;

    #[test]
    fn test_new_with_defaults() {
        let settings = VaultSettings::from_ambient(&AmbientConfig::default()).unwrap();
        let store = VaultStore::new(settings).unwrap();
        assert_eq!(store.settings().address, "https://127.0.0.1:8200");
    }

    #[test]
    fn test_new_with_missing_ca_cert_is_config_error() {
        let mut settings = VaultSettings::from_ambient(&AmbientConfig::default()).unwrap();
        settings.ca_cert = Some(PathBuf::from("/nonexistent/ca.pem"));
        let err = VaultStore::new(settings).err().unwrap();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn test_vault_client_builds_with_token() {
        let settings = VaultSettings::from_ambient(&AmbientConfig::from_pairs([
            ("VAULT_ADDR", "http://127.0.0.1:8200"),
            ("VAULT_NAMESPACE", "ops"),
        ]))
        .unwrap();
        let store = VaultStore::new(settings).unwrap();
        assert!(store.vault_client(Some("hvs.t")).is_ok());
    }

    #[tokio::test]
    async fn test_export_against_unreachable_server_fails() {
        let settings = VaultSettings::from_ambient(&AmbientConfig::from_pairs([
            ("VAULT_ADDR", "http://127.0.0.1:1"),
        ]))
        .unwrap();
        let store = VaultStore::new(settings).unwrap();

        let mut sink = Vec::new();
        let result = store.export_snapshot(&Session::from_token("hvs.t"), &mut sink).await;
        assert!(result.is_err());
        assert!(sink.is_empty());
    }
}
